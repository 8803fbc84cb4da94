use crate::{codec, query};

use aws_sdk_dynamodb::types;
use std::collections;

/// The store rejects batch write requests above this many items; chunking
/// beyond it is the caller's responsibility.
pub(crate) const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// Whether a read resolves to a full-table scan rather than an indexed
/// query.
///
/// An explicit `Scan` or `Query` action always wins; otherwise the read uses
/// the indexed query whenever a partition- or sort-key override is present
/// or the accumulated options already hold a non-empty key-condition
/// expression.
pub(crate) fn should_use_scan(query: &query::DynamoQuery) -> bool {
    match query.action {
        query::Action::Scan => true,
        query::Action::Query => false,
        _ => {
            let options = query.options_container();
            if options.partition_key.is_some() || options.sort_key.is_some() {
                return false;
            }
            !options
                .key_condition_expression
                .as_deref()
                .is_some_and(|expression| !expression.is_empty())
        }
    }
}

/// scan input
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct ScanInput {
    pub(crate) consistent_read: Option<bool>,
    pub(crate) exclusive_start_key: Option<codec::Item>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values: Option<codec::Item>,
    pub(crate) filter_expression: Option<String>,
    pub(crate) index_name: Option<String>,
    pub(crate) limit: Option<i32>,
    pub(crate) projection_expression: Option<String>,
    pub(crate) select: Option<types::Select>,
    pub(crate) table_name: String,
}

impl From<&query::DynamoQuery> for ScanInput {
    fn from(query: &query::DynamoQuery) -> Self {
        let options = query.options_container();
        Self {
            consistent_read: options.consistent_read,
            exclusive_start_key: options.exclusive_start_key,
            expression_attribute_names: options.expression_attribute_names,
            expression_attribute_values: options.expression_attribute_values,
            filter_expression: options.filter_expression,
            index_name: options.index_name,
            limit: options.limit,
            projection_expression: options.projection_expression,
            select: options.select,
            table_name: query.schema.table_name.clone(),
        }
    }
}

/// query input
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct QueryInput {
    pub(crate) consistent_read: Option<bool>,
    pub(crate) exclusive_start_key: Option<codec::Item>,
    pub(crate) expression_attribute_names: Option<collections::HashMap<String, String>>,
    pub(crate) expression_attribute_values: Option<codec::Item>,
    pub(crate) filter_expression: Option<String>,
    pub(crate) index_name: Option<String>,
    pub(crate) key_condition_expression: String,
    pub(crate) limit: Option<i32>,
    pub(crate) projection_expression: Option<String>,
    pub(crate) scan_index_forward: Option<bool>,
    pub(crate) select: Option<types::Select>,
    pub(crate) table_name: String,
}

impl From<&query::DynamoQuery> for QueryInput {
    /// # Panics
    ///
    /// Panics when no key condition was accumulated; an indexed query
    /// without one is a programming error.
    fn from(query: &query::DynamoQuery) -> Self {
        let options = query.options_container();
        let key_condition_expression = options
            .key_condition_expression
            .expect("an indexed query requires a key condition");
        Self {
            consistent_read: options.consistent_read,
            exclusive_start_key: options.exclusive_start_key,
            expression_attribute_names: options.expression_attribute_names,
            expression_attribute_values: options.expression_attribute_values,
            filter_expression: options.filter_expression,
            index_name: options.index_name,
            key_condition_expression,
            limit: options.limit,
            projection_expression: options.projection_expression,
            scan_index_forward: options.scan_index_forward,
            select: options.select,
            table_name: query.schema.table_name.clone(),
        }
    }
}

/// put item input
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct PutItemInput {
    pub(crate) condition_expression: Option<String>,
    pub(crate) item: codec::Item,
    pub(crate) return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    pub(crate) return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
    pub(crate) table_name: String,
}

impl From<&query::DynamoQuery> for PutItemInput {
    /// # Panics
    ///
    /// Panics unless the query carries exactly one input value map.
    fn from(query: &query::DynamoQuery) -> Self {
        assert_eq!(
            query.input.len(),
            1,
            "a create requires exactly one input value map"
        );
        let options = query.options_container();
        let item = item_with_default_keys(&query.input[0], query);
        Self {
            condition_expression: options.condition_expression,
            item,
            return_consumed_capacity: options.return_consumed_capacity,
            return_item_collection_metrics: options.return_item_collection_metrics,
            table_name: query.schema.table_name.clone(),
        }
    }
}

/// update item input
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct UpdateItemInput {
    pub(crate) attribute_updates: collections::HashMap<String, types::AttributeValueUpdate>,
    pub(crate) condition_expression: Option<String>,
    pub(crate) key: codec::Item,
    pub(crate) return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    pub(crate) return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
    pub(crate) table_name: String,
}

impl From<&query::DynamoQuery> for UpdateItemInput {
    /// # Panics
    ///
    /// Panics unless the query carries exactly one input value map and at
    /// least one filter establishing the item key.
    fn from(query: &query::DynamoQuery) -> Self {
        assert_eq!(
            query.input.len(),
            1,
            "an update requires exactly one input value map"
        );
        assert!(
            !query.filters.is_empty(),
            "an update requires at least one filter establishing the item key"
        );
        let key = query.key();
        assert!(!key.is_empty(), "an update requires a non-empty item key");

        let options = query.options_container();
        // Key attributes are the item's identity; they are never part of the
        // update map.
        let attribute_updates = query.input[0]
            .as_map()
            .iter()
            .filter(|(name, _)| !key.contains_key(name.as_str()))
            .map(|(name, value)| {
                let update = types::AttributeValueUpdate::builder()
                    .action(types::AttributeAction::Put)
                    .value(value.attribute_value())
                    .build();
                (name.clone(), update)
            })
            .collect();
        Self {
            attribute_updates,
            condition_expression: options.condition_expression,
            key,
            return_consumed_capacity: options.return_consumed_capacity,
            return_item_collection_metrics: options.return_item_collection_metrics,
            table_name: query.schema.table_name.clone(),
        }
    }
}

/// delete item input
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct DeleteItemInput {
    pub(crate) key: codec::Item,
    pub(crate) table_name: String,
}

impl From<&query::DynamoQuery> for DeleteItemInput {
    /// # Panics
    ///
    /// Panics when neither filters nor default keys establish an item key.
    fn from(query: &query::DynamoQuery) -> Self {
        let key = query.key();
        assert!(!key.is_empty(), "a delete requires a non-empty item key");
        Self {
            key,
            table_name: query.schema.table_name.clone(),
        }
    }
}

/// batch put input
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct BatchPutInput {
    pub(crate) items: Vec<codec::Item>,
    pub(crate) table_name: String,
}

impl From<&query::DynamoQuery> for BatchPutInput {
    /// # Panics
    ///
    /// Panics when the query carries no input, or more items than one batch
    /// request allows.
    fn from(query: &query::DynamoQuery) -> Self {
        assert!(
            !query.input.is_empty(),
            "a batch create requires at least one input value map"
        );
        assert!(
            query.input.len() <= MAX_BATCH_WRITE_ITEMS,
            "a batch create is capped at {MAX_BATCH_WRITE_ITEMS} items per request"
        );
        let items = query
            .input
            .iter()
            .map(|row| item_with_default_keys(row, query))
            .collect();
        Self {
            items,
            table_name: query.schema.table_name.clone(),
        }
    }
}

/// batch delete input
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct BatchDeleteInput {
    pub(crate) keys: Vec<codec::Item>,
    pub(crate) table_name: String,
}

impl From<&query::DynamoQuery> for BatchDeleteInput {
    /// # Panics
    ///
    /// Panics when the query carries no input, or more items than one batch
    /// request allows.
    fn from(query: &query::DynamoQuery) -> Self {
        assert!(
            !query.input.is_empty(),
            "a batch delete requires at least one key map"
        );
        assert!(
            query.input.len() <= MAX_BATCH_WRITE_ITEMS,
            "a batch delete is capped at {MAX_BATCH_WRITE_ITEMS} items per request"
        );
        let keys = query
            .input
            .iter()
            .map(|row| item_with_default_keys(row, query))
            .collect();
        Self {
            keys,
            table_name: query.schema.table_name.clone(),
        }
    }
}

/// Convert one input value map into an item, merging the default partition
/// key when the item does not already carry it.
fn item_with_default_keys(row: &query::QueryValue, query: &query::DynamoQuery) -> codec::Item {
    let mut item: codec::Item = row
        .as_map()
        .iter()
        .map(|(name, value)| (name.clone(), value.attribute_value()))
        .collect();
    if let Some((key, value)) = query.partition_key() {
        item.entry(key).or_insert_with(|| value.attribute_value());
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{
        Action, DynamoQuery, FieldFilterKey, Filter, FilterMethod, QueryValue,
        options::QueryOption,
    };
    use crate::schema::{DynamoSchema, KeyDescriptor};

    use indexmap::IndexMap;
    use rstest::rstest;

    fn bind(text: &str) -> QueryValue {
        QueryValue::Bind(types::AttributeValue::S(text.to_string()))
    }

    fn todo_input(id: &str) -> IndexMap<String, QueryValue> {
        IndexMap::from([
            ("TodoID".to_string(), bind(id)),
            ("Title".to_string(), bind("Buy milk")),
            (
                "Order".to_string(),
                QueryValue::Bind(types::AttributeValue::N("2".to_string())),
            ),
            (
                "Completed".to_string(),
                QueryValue::Bind(types::AttributeValue::Bool(false)),
            ),
        ])
    }

    #[rstest]
    #[case::plain_read_defaults_to_scan(|query: &mut DynamoQuery| { query.action = Action::Read; }, true)]
    #[case::explicit_scan(|query: &mut DynamoQuery| { query.action = Action::Scan; }, true)]
    #[case::explicit_query(|query: &mut DynamoQuery| { query.action = Action::Query; }, false)]
    #[case::partition_key_override(
        |query: &mut DynamoQuery| {
            query.set_partition_key("ID", QueryValue::Bind(types::AttributeValue::S("1".to_string())));
        },
        false
    )]
    #[case::sort_key_override(
        |query: &mut DynamoQuery| {
            query.set_sort_key(
                "Order",
                QueryValue::Bind(types::AttributeValue::N("2".to_string())),
                FilterMethod::Equal,
            );
        },
        false
    )]
    #[case::raw_key_condition_option(
        |query: &mut DynamoQuery| {
            query.options.push(QueryOption::KeyConditionExpression("#a = :a".to_string()));
        },
        false
    )]
    #[case::key_flagged_filter(
        |query: &mut DynamoQuery| {
            query.filters.push(Filter::Field(
                FieldFilterKey::partition("TodoID"),
                FilterMethod::Equal,
                QueryValue::Bind(types::AttributeValue::S("abc".to_string())),
            ));
        },
        false
    )]
    #[case::plain_filter_still_scans(
        |query: &mut DynamoQuery| {
            query.filters.push(Filter::Field(
                FieldFilterKey::new("Title"),
                FilterMethod::Equal,
                QueryValue::Bind(types::AttributeValue::S("Buy milk".to_string())),
            ));
        },
        true
    )]
    fn test_scan_vs_query_decision(
        #[case] prepare: fn(&mut DynamoQuery),
        #[case] scan: bool,
    ) {
        let mut query = DynamoQuery::new(DynamoSchema::from("Todo"));
        prepare(&mut query);
        assert_eq!(should_use_scan(&query), scan);
    }

    #[test]
    fn test_explicit_scan_wins_over_keys_present() {
        let mut query = DynamoQuery::new(DynamoSchema::from("Todo"));
        query.set_partition_key("ID", bind("1"));
        query.action = Action::Scan;
        assert!(should_use_scan(&query));
    }

    #[test]
    fn test_put_item_input_is_the_encoded_record() {
        let mut query = DynamoQuery::new(DynamoSchema::from("Todo"));
        query.action = Action::Create;
        query.input.push(QueryValue::Map(todo_input("abc")));

        let input = PutItemInput::from(&query);

        assert_eq!(input.table_name, "Todo");
        assert_eq!(
            input.item["TodoID"],
            types::AttributeValue::S("abc".to_string())
        );
        assert_eq!(
            input.item["Title"],
            types::AttributeValue::S("Buy milk".to_string())
        );
        assert_eq!(
            input.item["Order"],
            types::AttributeValue::N("2".to_string())
        );
        assert_eq!(input.item["Completed"], types::AttributeValue::Bool(false));
        assert_eq!(input.item.len(), 4);
        // A put never renders a key condition.
        assert_eq!(input.condition_expression, None);
    }

    #[test]
    fn test_put_item_merges_default_partition_key_when_absent() {
        let schema = DynamoSchema::new("Todo")
            .partition_key(KeyDescriptor::with_default("ListID", "list"));
        let mut query = DynamoQuery::new(schema);
        query.action = Action::Create;
        query.input.push(QueryValue::Map(todo_input("abc")));

        let input = PutItemInput::from(&query);
        assert_eq!(
            input.item["ListID"],
            types::AttributeValue::S("list".to_string())
        );
    }

    #[test]
    fn test_put_item_keeps_explicit_key_over_default() {
        let schema = DynamoSchema::new("Todo")
            .partition_key(KeyDescriptor::with_default("ListID", "list"));
        let mut query = DynamoQuery::new(schema);
        query.action = Action::Create;
        let mut row = todo_input("abc");
        row.insert("ListID".to_string(), bind("archive"));
        query.input.push(QueryValue::Map(row));

        let input = PutItemInput::from(&query);
        assert_eq!(
            input.item["ListID"],
            types::AttributeValue::S("archive".to_string())
        );
    }

    #[test]
    #[should_panic(expected = "exactly one input value map")]
    fn test_put_item_requires_exactly_one_input() {
        let mut query = DynamoQuery::new(DynamoSchema::from("Todo"));
        query.action = Action::Create;
        let _ = PutItemInput::from(&query);
    }

    #[test]
    fn test_update_item_builds_key_and_updates() {
        let mut query = DynamoQuery::new(DynamoSchema::from("Todo"));
        query.action = Action::Update;
        query.filters.push(Filter::Field(
            FieldFilterKey::partition("TodoID"),
            FilterMethod::Equal,
            bind("abc"),
        ));
        query.input.push(QueryValue::Map(todo_input("abc")));

        let input = UpdateItemInput::from(&query);

        assert_eq!(
            input.key,
            codec::Item::from([(
                "TodoID".to_string(),
                types::AttributeValue::S("abc".to_string()),
            )])
        );
        // The identity attribute never appears in the update map.
        assert!(!input.attribute_updates.contains_key("TodoID"));
        let title = &input.attribute_updates["Title"];
        assert_eq!(title.action(), Some(&types::AttributeAction::Put));
        assert_eq!(
            title.value(),
            Some(&types::AttributeValue::S("Buy milk".to_string()))
        );
        assert_eq!(input.attribute_updates.len(), 3);
    }

    #[test]
    #[should_panic(expected = "at least one filter")]
    fn test_update_item_requires_filters() {
        let mut query = DynamoQuery::new(DynamoSchema::from("Todo"));
        query.action = Action::Update;
        query.input.push(QueryValue::Map(todo_input("abc")));
        let _ = UpdateItemInput::from(&query);
    }

    #[test]
    fn test_delete_item_key_from_filters_and_defaults() {
        let schema = DynamoSchema::new("Todo")
            .partition_key(KeyDescriptor::with_default("ListID", "list"));
        let mut query = DynamoQuery::new(schema);
        query.action = Action::Delete;
        query.filters.push(Filter::Field(
            FieldFilterKey::new("TodoID"),
            FilterMethod::Equal,
            bind("abc"),
        ));

        let input = DeleteItemInput::from(&query);

        assert_eq!(
            input.key["TodoID"],
            types::AttributeValue::S("abc".to_string())
        );
        assert_eq!(
            input.key["ListID"],
            types::AttributeValue::S("list".to_string())
        );
    }

    #[test]
    #[should_panic(expected = "non-empty item key")]
    fn test_delete_item_requires_a_key() {
        let mut query = DynamoQuery::new(DynamoSchema::from("Todo"));
        query.action = Action::Delete;
        let _ = DeleteItemInput::from(&query);
    }

    #[test]
    fn test_batch_put_carries_every_item() {
        let mut query = DynamoQuery::new(DynamoSchema::from("Todo"));
        query.action = Action::BatchCreate;
        query.input.push(QueryValue::Map(todo_input("a")));
        query.input.push(QueryValue::Map(todo_input("b")));

        let input = BatchPutInput::from(&query);
        assert_eq!(input.items.len(), 2);
        assert_eq!(
            input.items[1]["TodoID"],
            types::AttributeValue::S("b".to_string())
        );
    }

    #[test]
    #[should_panic(expected = "capped at 25 items")]
    fn test_batch_put_capped_at_store_ceiling() {
        let mut query = DynamoQuery::new(DynamoSchema::from("Todo"));
        query.action = Action::BatchCreate;
        for index in 0..26 {
            query
                .input
                .push(QueryValue::Map(todo_input(&index.to_string())));
        }
        let _ = BatchPutInput::from(&query);
    }

    #[test]
    fn test_batch_delete_keys_merge_defaults() {
        let schema = DynamoSchema::new("Todo")
            .partition_key(KeyDescriptor::with_default("ListID", "list"));
        let mut query = DynamoQuery::new(schema);
        query.action = Action::BatchDelete;
        query.input.push(QueryValue::Map(IndexMap::from([(
            "TodoID".to_string(),
            bind("a"),
        )])));

        let input = BatchDeleteInput::from(&query);
        assert_eq!(input.keys.len(), 1);
        assert_eq!(
            input.keys[0]["ListID"],
            types::AttributeValue::S("list".to_string())
        );
    }

    #[test]
    fn test_query_input_requires_accumulated_key_condition() {
        let mut query = DynamoQuery::new(DynamoSchema::from("Todo"));
        query.set_partition_key("TodoID", bind("abc"));

        let input = QueryInput::from(&query);
        assert_eq!(input.key_condition_expression, "#TodoID = :partitionID");
        assert_eq!(input.table_name, "Todo");
    }

    #[test]
    #[should_panic(expected = "requires a key condition")]
    fn test_query_input_panics_without_key_condition() {
        let query = DynamoQuery::new(DynamoSchema::from("Todo"));
        let _ = QueryInput::from(&query);
    }
}
