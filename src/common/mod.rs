pub mod errors;
pub mod utils;

pub const STACK_NAME_DEFAULT: &str = "NanTuanTrackerStack";
pub const TABLE_NAME_DEFAULT: &str = "Guilds";
/// The guild whose matches the poller tracks.
pub const GUILD_ID_DEFAULT: i64 = 117311;
pub const ARTIFACT_PATH_DEFAULT: &str = "poller/target/x86_64-unknown-linux-musl/release/lambda";

/// Plain-text logs on stderr so `synth` can keep stdout for the template.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
