use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::{AttributeValue, KeyType, TableDescription};
use tracing::{info, warn};

use crate::common::errors::Error;
use crate::stack::{KeyValueTable, PARTITION_KEY};

/// Attribute holding the newest match the poller has already published.
pub const MATCH_ID_ATTRIBUTE: &str = "match_id";

/// The parts of a live table that the stack definition pins down.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedTable {
    pub partition_key: Option<String>,
    pub partition_key_type: Option<String>,
    pub read_capacity: Option<i64>,
    pub write_capacity: Option<i64>,
}

impl From<&TableDescription> for ObservedTable {
    fn from(description: &TableDescription) -> Self {
        let partition_key = description
            .key_schema()
            .iter()
            .find(|element| element.key_type() == &KeyType::Hash)
            .map(|element| element.attribute_name().to_string());
        let partition_key_type = partition_key.as_ref().and_then(|name| {
            description
                .attribute_definitions()
                .iter()
                .find(|definition| definition.attribute_name() == name.as_str())
                .map(|definition| definition.attribute_type().as_str().to_string())
        });
        let throughput = description.provisioned_throughput();

        Self {
            partition_key,
            partition_key_type,
            read_capacity: throughput.and_then(|t| t.read_capacity_units()),
            write_capacity: throughput.and_then(|t| t.write_capacity_units()),
        }
    }
}

pub fn check(expected: &KeyValueTable, observed: &ObservedTable) -> Result<(), Error> {
    let mismatch = |reason: String| Error::TableMismatch {
        table: expected.table_name.clone(),
        reason,
    };

    let key = &expected.partition_key;
    if observed.partition_key.as_deref() != Some(key.name) {
        return Err(mismatch(format!(
            "partition key is {:?}, expected {:?}",
            observed.partition_key, key.name
        )));
    }
    if observed.partition_key_type.as_deref() != Some(key.attribute_type.code()) {
        return Err(mismatch(format!(
            "partition key type is {:?}, expected {}",
            observed.partition_key_type,
            key.attribute_type.code()
        )));
    }
    let capacity = (observed.read_capacity, observed.write_capacity);
    let wanted = (
        Some(i64::from(expected.read_capacity)),
        Some(i64::from(expected.write_capacity)),
    );
    if capacity != wanted {
        return Err(mismatch(format!(
            "provisioned capacity is {capacity:?}, expected {wanted:?}"
        )));
    }

    Ok(())
}

/// Compares the live table against the definition.
#[tracing::instrument(skip(dynamo_client, expected), fields(table = %expected.table_name))]
pub async fn verify(
    dynamo_client: &aws_sdk_dynamodb::Client,
    expected: &KeyValueTable,
) -> Result<(), Error> {
    let output = dynamo_client
        .describe_table()
        .table_name(&expected.table_name)
        .send()
        .await
        .map_err(Error::aws)?;

    let description = output.table().ok_or_else(|| Error::TableMismatch {
        table: expected.table_name.clone(),
        reason: "table description is empty".into(),
    })?;

    check(expected, &ObservedTable::from(description))?;
    info!("Table matches the stack definition");

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Inserted,
    AlreadyPresent,
}

/// Writes the initial `{id, match_id}` row the poller reads on its first run.
/// An existing row is never overwritten.
#[tracing::instrument(skip(dynamo_client))]
pub async fn seed(
    dynamo_client: &aws_sdk_dynamodb::Client,
    table_name: &str,
    id: i64,
    match_id: i64,
) -> Result<SeedOutcome, Error> {
    let result = dynamo_client
        .put_item()
        .table_name(table_name)
        .item(PARTITION_KEY, AttributeValue::N(id.to_string()))
        .item(MATCH_ID_ATTRIBUTE, AttributeValue::N(match_id.to_string()))
        .condition_expression(format!("attribute_not_exists({PARTITION_KEY})"))
        .send()
        .await;

    match result {
        Ok(_) => {
            info!("Seeded row {id} with match_id {match_id}");
            Ok(SeedOutcome::Inserted)
        }
        Err(err)
            if err
                .as_service_error()
                .map_or(false, PutItemError::is_conditional_check_failed_exception) =>
        {
            warn!("Row {id} already exists, leaving it untouched");
            Ok(SeedOutcome::AlreadyPresent)
        }
        Err(err) => Err(Error::aws(err)),
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::types::{
        AttributeDefinition, KeySchemaElement, ProvisionedThroughputDescription,
        ScalarAttributeType,
    };

    use super::*;
    use crate::stack::{AttributeType, KeyAttribute, TABLE_ID};

    fn expected(read: u32, write: u32) -> KeyValueTable {
        KeyValueTable {
            logical_id: TABLE_ID,
            table_name: "Guilds".into(),
            read_capacity: read,
            write_capacity: write,
            partition_key: KeyAttribute {
                name: "id",
                attribute_type: AttributeType::Number,
            },
        }
    }

    fn observed(key: &str, key_type: &str, read: i64, write: i64) -> ObservedTable {
        ObservedTable {
            partition_key: Some(key.into()),
            partition_key_type: Some(key_type.into()),
            read_capacity: Some(read),
            write_capacity: Some(write),
        }
    }

    #[test]
    fn matching_table_passes() {
        assert!(check(&expected(5, 10), &observed("id", "N", 5, 10)).is_ok());
    }

    #[test]
    fn string_partition_key_is_a_mismatch() {
        let err = check(&expected(5, 10), &observed("id", "S", 5, 10)).unwrap_err();
        assert!(matches!(err, Error::TableMismatch { reason, .. } if reason.contains("type")));
    }

    #[test]
    fn renamed_partition_key_is_a_mismatch() {
        assert!(check(&expected(2, 2), &observed("guild_id", "N", 2, 2)).is_err());
    }

    #[test]
    fn drifted_capacity_is_a_mismatch() {
        let err = check(&expected(2, 2), &observed("id", "N", 5, 10)).unwrap_err();
        assert!(matches!(err, Error::TableMismatch { reason, .. } if reason.contains("capacity")));
    }

    #[test]
    fn on_demand_table_is_a_mismatch() {
        let observed = ObservedTable {
            read_capacity: None,
            write_capacity: None,
            ..observed("id", "N", 0, 0)
        };
        assert!(check(&expected(5, 10), &observed).is_err());
    }

    #[test]
    fn observes_hash_key_from_description() {
        let description = TableDescription::builder()
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name("id")
                    .key_type(KeyType::Hash)
                    .build()
                    .unwrap(),
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name("id")
                    .attribute_type(ScalarAttributeType::N)
                    .build()
                    .unwrap(),
            )
            .provisioned_throughput(
                ProvisionedThroughputDescription::builder()
                    .read_capacity_units(2)
                    .write_capacity_units(2)
                    .build(),
            )
            .build();

        assert_eq!(ObservedTable::from(&description), observed("id", "N", 2, 2));
    }
}
