//! CloudFormation rendering of a [`StackDefinition`].
//!
//! `serde_json` keeps object keys sorted, so rendering the same definition twice
//! yields byte-identical templates and CloudFormation sees no spurious diff.

use serde_json::{json, Map, Value};

use crate::common::errors::Error;
use crate::stack::{
    EnvValue, ExecutionRole, InvokePermission, KeyValueTable, LogGroup, Resource, ScheduleRule,
    ScheduledFunction, StackDefinition, ASSET_BUCKET_PARAM, ASSET_KEY_PARAM,
};

const FORMAT_VERSION: &str = "2010-09-09";
const DESCRIPTION: &str = "Scheduled match poller with its execution role and guild table";
const SCHEDULE_TARGET_ID: &str = "Target0";

pub fn render(stack: &StackDefinition) -> Value {
    let mut parameters = Map::new();
    for parameter in stack.parameters() {
        let mut body = json!({
            "Type": "String",
            "Description": parameter.description,
        });
        if parameter.no_echo {
            body["NoEcho"] = Value::Bool(true);
        }
        parameters.insert(parameter.name.to_string(), body);
    }

    let mut resources = Map::new();
    for resource in stack.resources() {
        let properties = match resource {
            Resource::Role(role) => role_properties(role),
            Resource::Function(function) => function_properties(function),
            Resource::LogGroup(group) => log_group_properties(group),
            Resource::Rule(rule) => rule_properties(rule),
            Resource::Permission(permission) => permission_properties(permission),
            Resource::Table(table) => table_properties(table),
        };

        let mut body = json!({
            "Type": resource.type_name(),
            "Properties": properties,
        });
        if let Resource::Table(_) = resource {
            body["DeletionPolicy"] = json!("Retain");
            body["UpdateReplacePolicy"] = json!("Retain");
        }
        resources.insert(resource.logical_id().to_string(), body);
    }

    json!({
        "AWSTemplateFormatVersion": FORMAT_VERSION,
        "Description": DESCRIPTION,
        "Parameters": parameters,
        "Resources": resources,
        "Outputs": outputs(stack),
    })
}

pub fn to_json_string(stack: &StackDefinition) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(&render(stack))?)
}

fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

fn role_properties(role: &ExecutionRole) -> Value {
    let policy_arns: Vec<Value> = role
        .managed_policies
        .iter()
        .map(|policy| {
            json!({
                "Fn::Join": ["", ["arn:", reference("AWS::Partition"), format!(":iam::aws:policy/{policy}")]]
            })
        })
        .collect();

    json!({
        "AssumeRolePolicyDocument": {
            "Version": "2012-10-17",
            "Statement": [{
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": { "Service": role.service_principal },
            }],
        },
        "ManagedPolicyArns": policy_arns,
    })
}

fn function_properties(function: &ScheduledFunction) -> Value {
    let variables: Map<String, Value> = function
        .environment
        .iter()
        .map(|(key, value)| {
            let value = match value {
                EnvValue::Literal(literal) => Value::String(literal.clone()),
                EnvValue::Parameter(name) => reference(name),
            };
            (key.clone(), value)
        })
        .collect();

    json!({
        "Description": function.description,
        "Code": {
            "S3Bucket": reference(ASSET_BUCKET_PARAM),
            "S3Key": reference(ASSET_KEY_PARAM),
        },
        "Runtime": function.runtime.as_str(),
        "Architectures": [function.architecture.as_str()],
        "Handler": function.handler,
        "Timeout": function.timeout_seconds,
        "Role": get_att(function.role, "Arn"),
        "Environment": { "Variables": variables },
    })
}

fn log_group_properties(group: &LogGroup) -> Value {
    json!({
        "LogGroupName": { "Fn::Join": ["", ["/aws/lambda/", reference(group.function)]] },
        "RetentionInDays": group.retention_days,
    })
}

fn rule_properties(rule: &ScheduleRule) -> Value {
    json!({
        "ScheduleExpression": rule.expression(),
        "State": "ENABLED",
        "Targets": [{
            "Arn": get_att(rule.target, "Arn"),
            "Id": SCHEDULE_TARGET_ID,
        }],
    })
}

fn permission_properties(permission: &InvokePermission) -> Value {
    json!({
        "Action": "lambda:InvokeFunction",
        "FunctionName": get_att(permission.function, "Arn"),
        "Principal": permission.principal,
        "SourceArn": get_att(permission.source_rule, "Arn"),
    })
}

fn table_properties(table: &KeyValueTable) -> Value {
    json!({
        "TableName": table.table_name,
        "BillingMode": "PROVISIONED",
        "AttributeDefinitions": [{
            "AttributeName": table.partition_key.name,
            "AttributeType": table.partition_key.attribute_type.code(),
        }],
        "KeySchema": [{
            "AttributeName": table.partition_key.name,
            "KeyType": "HASH",
        }],
        "ProvisionedThroughput": {
            "ReadCapacityUnits": table.read_capacity,
            "WriteCapacityUnits": table.write_capacity,
        },
    })
}

fn outputs(stack: &StackDefinition) -> Value {
    json!({
        "FunctionName": { "Value": reference(stack.function.logical_id) },
        "FunctionArn": { "Value": get_att(stack.function.logical_id, "Arn") },
        "ScheduleRuleArn": { "Value": get_att(stack.rule.logical_id, "Arn") },
        "TableName": { "Value": reference(stack.table.logical_id) },
    })
}
