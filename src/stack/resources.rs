use std::collections::BTreeMap;
use std::path::PathBuf;

pub const ROLE_ID: &str = "scannerLambdaRole";
pub const FUNCTION_ID: &str = "PollerLambda";
pub const LOG_GROUP_ID: &str = "PollerLambdaLogGroup";
pub const RULE_ID: &str = "lambdaScheduleRule";
pub const PERMISSION_ID: &str = "PollerLambdaSchedulePermission";
pub const TABLE_ID: &str = "GuildIdTable";

pub const PARTITION_KEY: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRole {
    pub logical_id: &'static str,
    pub service_principal: &'static str,
    pub managed_policies: Vec<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    ProvidedAl2,
}

impl Runtime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProvidedAl2 => "provided.al2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    X86_64,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
        }
    }
}

/// Value of a function environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvValue {
    Literal(String),
    /// Filled from a deploy-time stack parameter.
    Parameter(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledFunction {
    pub logical_id: &'static str,
    pub description: &'static str,
    pub artifact_path: PathBuf,
    pub runtime: Runtime,
    pub architecture: Architecture,
    pub handler: &'static str,
    pub timeout_seconds: u32,
    pub environment: BTreeMap<String, EnvValue>,
    pub role: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogGroup {
    pub logical_id: &'static str,
    pub function: &'static str,
    pub retention_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRule {
    pub logical_id: &'static str,
    pub interval_minutes: u32,
    pub target: &'static str,
}

impl ScheduleRule {
    pub fn expression(&self) -> String {
        match self.interval_minutes {
            1 => "rate(1 minute)".to_string(),
            n => format!("rate({n} minutes)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokePermission {
    pub logical_id: &'static str,
    pub function: &'static str,
    pub source_rule: &'static str,
    pub principal: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    Number,
}

impl AttributeType {
    /// DynamoDB scalar type code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Number => "N",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: &'static str,
    pub attribute_type: AttributeType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueTable {
    pub logical_id: &'static str,
    pub table_name: String,
    pub read_capacity: u32,
    pub write_capacity: u32,
    pub partition_key: KeyAttribute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource<'a> {
    Role(&'a ExecutionRole),
    Function(&'a ScheduledFunction),
    LogGroup(&'a LogGroup),
    Rule(&'a ScheduleRule),
    Permission(&'a InvokePermission),
    Table(&'a KeyValueTable),
}

impl Resource<'_> {
    pub fn logical_id(&self) -> &'static str {
        match self {
            Self::Role(role) => role.logical_id,
            Self::Function(function) => function.logical_id,
            Self::LogGroup(group) => group.logical_id,
            Self::Rule(rule) => rule.logical_id,
            Self::Permission(permission) => permission.logical_id,
            Self::Table(table) => table.logical_id,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Role(_) => "AWS::IAM::Role",
            Self::Function(_) => "AWS::Lambda::Function",
            Self::LogGroup(_) => "AWS::Logs::LogGroup",
            Self::Rule(_) => "AWS::Events::Rule",
            Self::Permission(_) => "AWS::Lambda::Permission",
            Self::Table(_) => "AWS::DynamoDB::Table",
        }
    }

    /// Logical ids this resource references.
    pub fn dependencies(&self) -> Vec<&'static str> {
        match self {
            Self::Role(_) | Self::Table(_) => Vec::new(),
            Self::Function(function) => vec![function.role],
            Self::LogGroup(group) => vec![group.function],
            Self::Rule(rule) => vec![rule.target],
            Self::Permission(permission) => vec![permission.function, permission.source_rule],
        }
    }
}
