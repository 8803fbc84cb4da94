use crate::{codec, query};

use aws_sdk_dynamodb::types;
use std::collections;

/// Fixed value placeholder for the partition key override.
const PARTITION_KEY_PLACEHOLDER: &str = ":partitionID";

/// Fixed value placeholder for the sort key override.
const SORT_KEY_PLACEHOLDER: &str = ":sortKey";

/// An option directive set on a query.
///
/// Most of these are provider options passed along as-is; the key variants
/// carry an abstraction (placeholder synthesis plus key-condition rendering).
/// Directives are applied in stack order, so for a repeated option whatever
/// was set last wins.
#[derive(Clone, Debug)]
pub enum QueryOption {
    /// Override the sort key, with the comparison method to render.
    SortKey(String, query::QueryValue, query::FilterMethod),
    /// Override the partition key (always an equality comparison).
    PartitionKey(String, query::QueryValue),
    /// The maximum number of items to evaluate.
    Limit(i32),
    /// Whether to use a strongly consistent read.
    ConsistentRead(bool),
    /// The pagination cursor from a previous read.
    ExclusiveStartKey(codec::Item),
    /// Extra expression attribute name placeholders, merged by key.
    ExpressionAttributeNames(collections::HashMap<String, String>),
    /// Extra expression attribute value placeholders, merged by key.
    ExpressionAttributeValues(codec::Item),
    /// A raw filter expression, appended to any accumulated one.
    FilterExpression(String),
    /// The secondary index to read.
    IndexName(String),
    /// A raw key-condition expression, appended to any accumulated one.
    KeyConditionExpression(String),
    /// A projection expression limiting the attributes returned.
    ProjectionExpression(String),
    /// Whether to report consumed capacity.
    ReturnConsumedCapacity(types::ReturnConsumedCapacity),
    /// Sort direction for indexed queries.
    ScanIndexForward(bool),
    /// Which attributes the read returns.
    Select(types::Select),
    /// A condition expression for writes.
    ConditionExpression(String),
    /// Whether to report item collection metrics.
    ReturnItemCollectionMetrics(types::ReturnItemCollectionMetrics),
}

impl QueryOption {
    /// Apply this directive to a container.
    ///
    /// Each variant writes exactly one field, except the two key variants,
    /// which also register their placeholders and append to the
    /// key-condition expression.
    fn set_option(self, options: &mut OptionsContainer) {
        match self {
            Self::Limit(limit) => options.limit = Some(limit),
            Self::ConsistentRead(consistent) => options.consistent_read = Some(consistent),
            Self::ExclusiveStartKey(key) => options.exclusive_start_key = Some(key),
            Self::ExpressionAttributeNames(names) => {
                for (placeholder, name) in names {
                    options.set_expression_attribute_name(placeholder, name);
                }
            }
            Self::ExpressionAttributeValues(values) => {
                for (placeholder, value) in values {
                    options.set_expression_attribute_value(placeholder, value);
                }
            }
            Self::FilterExpression(expression) => options.append_filter_expression(expression),
            Self::IndexName(name) => options.index_name = Some(name),
            Self::KeyConditionExpression(expression) => {
                options.append_key_condition_expression(expression);
            }
            Self::ProjectionExpression(expression) => {
                options.projection_expression = Some(expression);
            }
            Self::ReturnConsumedCapacity(capacity) => {
                options.return_consumed_capacity = Some(capacity);
            }
            Self::ScanIndexForward(forward) => options.scan_index_forward = Some(forward),
            Self::Select(select) => options.select = Some(select),
            Self::ConditionExpression(expression) => {
                options.condition_expression = Some(expression);
            }
            Self::ReturnItemCollectionMetrics(metrics) => {
                options.return_item_collection_metrics = Some(metrics);
            }
            Self::SortKey(key, value, method) => {
                options.set_expression_attribute_value(
                    SORT_KEY_PLACEHOLDER.to_string(),
                    value.attribute_value(),
                );
                options.add_key_condition_expression(&key, method, SORT_KEY_PLACEHOLDER);
                options.sort_key = Some((key, value, method));
            }
            Self::PartitionKey(key, value) => {
                options.set_expression_attribute_value(
                    PARTITION_KEY_PLACEHOLDER.to_string(),
                    value.attribute_value(),
                );
                options.add_key_condition_expression(
                    &key,
                    query::FilterMethod::Equal,
                    PARTITION_KEY_PLACEHOLDER,
                );
                options.partition_key = Some((key, value));
            }
        }
    }
}

/// The accumulated option state of a query, ready to shape a request.
///
/// Built by folding the query's option stack in order and then routing its
/// filters: a filter on a partition- or sort-key field lands in the
/// key-condition expression, any other filter in the filter expression, each
/// joined to prior content with `AND`.
#[derive(Clone, Debug, Default)]
pub struct OptionsContainer {
    /// The maximum number of items to evaluate.
    pub limit: Option<i32>,
    /// Whether to use a strongly consistent read.
    pub consistent_read: Option<bool>,
    /// The pagination cursor from a previous read.
    pub exclusive_start_key: Option<codec::Item>,
    /// Attribute name placeholders (`#name` to attribute name).
    pub expression_attribute_names: Option<collections::HashMap<String, String>>,
    /// Attribute value placeholders (`:name` to attribute value).
    pub expression_attribute_values: Option<codec::Item>,
    /// The accumulated filter expression.
    pub filter_expression: Option<String>,
    /// The secondary index to read.
    pub index_name: Option<String>,
    /// The accumulated key-condition expression.
    pub key_condition_expression: Option<String>,
    /// A projection expression limiting the attributes returned.
    pub projection_expression: Option<String>,
    /// Whether to report consumed capacity.
    pub return_consumed_capacity: Option<types::ReturnConsumedCapacity>,
    /// Sort direction for indexed queries.
    pub scan_index_forward: Option<bool>,
    /// Which attributes the read returns.
    pub select: Option<types::Select>,
    /// A condition expression for writes.
    pub condition_expression: Option<String>,
    /// Whether to report item collection metrics.
    pub return_item_collection_metrics: Option<types::ReturnItemCollectionMetrics>,
    /// The effective sort key override.
    pub sort_key: Option<(String, query::QueryValue, query::FilterMethod)>,
    /// The effective partition key override.
    pub partition_key: Option<(String, query::QueryValue)>,
}

impl OptionsContainer {
    pub(crate) fn from_query(query: &query::DynamoQuery) -> Self {
        let mut options = Self::default();
        for option in query.options.iter().cloned() {
            option.set_option(&mut options);
        }
        for filter in &query.filters {
            let query::Filter::Field(field_key, method, value) = filter;
            let value_placeholder = placeholder(":", &field_key.key);
            options
                .set_expression_attribute_value(value_placeholder.clone(), value.attribute_value());
            if field_key.is_partition_key || field_key.is_sort_key {
                options.add_key_condition_expression(&field_key.key, *method, &value_placeholder);
            } else {
                options.add_filter_expression(&field_key.key, *method, &value_placeholder);
            }
        }
        options
    }

    /// Register a value placeholder; the last registration for a placeholder
    /// wins.
    pub fn set_expression_attribute_value(
        &mut self,
        placeholder: String,
        value: types::AttributeValue,
    ) {
        self.expression_attribute_values
            .get_or_insert_with(codec::Item::new)
            .insert(placeholder, value);
    }

    /// Register a name placeholder; the last registration for a placeholder
    /// wins.
    pub fn set_expression_attribute_name(&mut self, placeholder: String, name: String) {
        self.expression_attribute_names
            .get_or_insert_with(collections::HashMap::new)
            .insert(placeholder, name);
    }

    /// Append a comparison to the key-condition expression.
    ///
    /// Synthesizes the `#<key>` name placeholder (spaces stripped), registers
    /// it, and joins the rendered comparison to any prior content with `AND`.
    ///
    /// # Panics
    ///
    /// Panics on [`query::FilterMethod::NotEqual`]: the store does not accept
    /// a not-equal comparison on a partition or sort key, so reaching this is
    /// a programming error.
    pub fn add_key_condition_expression(
        &mut self,
        key: &str,
        method: query::FilterMethod,
        value_placeholder: &str,
    ) {
        assert!(
            method != query::FilterMethod::NotEqual,
            "cannot use a not-equal comparison on a partition or sort key"
        );
        let name_placeholder = placeholder("#", key);
        self.set_expression_attribute_name(name_placeholder.clone(), key.to_string());
        let comparison = method.render(&name_placeholder, value_placeholder);
        self.append_key_condition_expression(comparison);
    }

    /// Append a comparison to the filter expression, synthesizing and
    /// registering the `#<key>` name placeholder.
    pub fn add_filter_expression(
        &mut self,
        key: &str,
        method: query::FilterMethod,
        value_placeholder: &str,
    ) {
        let name_placeholder = placeholder("#", key);
        self.set_expression_attribute_name(name_placeholder.clone(), key.to_string());
        let comparison = method.render(&name_placeholder, value_placeholder);
        self.append_filter_expression(comparison);
    }

    fn append_key_condition_expression(&mut self, expression: String) {
        self.key_condition_expression = Some(match self.key_condition_expression.take() {
            Some(existing) => format!("{existing} AND {expression}"),
            None => expression,
        });
    }

    fn append_filter_expression(&mut self, expression: String) {
        self.filter_expression = Some(match self.filter_expression.take() {
            Some(existing) => format!("{existing} AND {expression}"),
            None => expression,
        });
    }
}

/// A placeholder from a key: the prefix plus the key with spaces stripped.
fn placeholder(prefix: &str, key: &str) -> String {
    format!("{prefix}{}", key.replace(' ', ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{
        Action, DynamoQuery, FieldFilterKey, Filter, FilterMethod, QueryValue,
    };
    use crate::schema::DynamoSchema;

    use rstest::rstest;

    fn empty_query() -> DynamoQuery {
        DynamoQuery::new(DynamoSchema::from("Todo"))
    }

    fn bind(text: &str) -> QueryValue {
        QueryValue::Bind(types::AttributeValue::S(text.to_string()))
    }

    #[test]
    fn test_passthrough_options() {
        let mut query = empty_query();
        query.action = Action::Read;
        query.options.extend([
            QueryOption::Limit(1),
            QueryOption::ConsistentRead(true),
            QueryOption::ExclusiveStartKey(codec::Item::from([(
                "foo".to_string(),
                types::AttributeValue::S("bar".to_string()),
            )])),
            QueryOption::ExpressionAttributeNames(collections::HashMap::from([(
                "#bar".to_string(),
                "boom".to_string(),
            )])),
            QueryOption::ExpressionAttributeValues(codec::Item::from([(
                ":bar".to_string(),
                types::AttributeValue::S("bing".to_string()),
            )])),
            QueryOption::FilterExpression("filtering".to_string()),
            QueryOption::IndexName("index".to_string()),
            QueryOption::KeyConditionExpression("key-condition".to_string()),
            QueryOption::ProjectionExpression("project".to_string()),
            QueryOption::ReturnConsumedCapacity(types::ReturnConsumedCapacity::None),
            QueryOption::ScanIndexForward(true),
            QueryOption::Select(types::Select::AllAttributes),
            QueryOption::ConditionExpression("boom".to_string()),
            QueryOption::ReturnItemCollectionMetrics(types::ReturnItemCollectionMetrics::Size),
        ]);

        let options = query.options_container();

        assert_eq!(options.limit, Some(1));
        assert_eq!(options.consistent_read, Some(true));
        assert_eq!(
            options.exclusive_start_key.unwrap()["foo"],
            types::AttributeValue::S("bar".to_string())
        );
        assert_eq!(
            options.expression_attribute_names.unwrap()["#bar"],
            "boom"
        );
        assert_eq!(
            options.expression_attribute_values.unwrap()[":bar"],
            types::AttributeValue::S("bing".to_string())
        );
        assert_eq!(options.filter_expression.as_deref(), Some("filtering"));
        assert_eq!(options.index_name.as_deref(), Some("index"));
        assert_eq!(
            options.key_condition_expression.as_deref(),
            Some("key-condition")
        );
        assert_eq!(options.projection_expression.as_deref(), Some("project"));
        assert_eq!(
            options.return_consumed_capacity,
            Some(types::ReturnConsumedCapacity::None)
        );
        assert_eq!(options.scan_index_forward, Some(true));
        assert_eq!(options.select, Some(types::Select::AllAttributes));
        assert_eq!(options.condition_expression.as_deref(), Some("boom"));
        assert_eq!(
            options.return_item_collection_metrics,
            Some(types::ReturnItemCollectionMetrics::Size)
        );
    }

    #[test]
    fn test_later_directive_wins_for_single_value_options() {
        let mut query = empty_query();
        query
            .options
            .extend([QueryOption::Limit(1), QueryOption::Limit(50)]);
        assert_eq!(query.options_container().limit, Some(50));
    }

    #[test]
    fn test_expression_directives_append_with_and() {
        let mut query = empty_query();
        query.options.extend([
            QueryOption::FilterExpression("#a = :a".to_string()),
            QueryOption::FilterExpression("#b = :b".to_string()),
        ]);
        assert_eq!(
            query.options_container().filter_expression.as_deref(),
            Some("#a = :a AND #b = :b")
        );
    }

    #[test]
    fn test_name_and_value_maps_merge_by_key() {
        let mut query = empty_query();
        query.options.extend([
            QueryOption::ExpressionAttributeNames(collections::HashMap::from([(
                "#a".to_string(),
                "a".to_string(),
            )])),
            QueryOption::ExpressionAttributeNames(collections::HashMap::from([(
                "#b".to_string(),
                "b".to_string(),
            )])),
        ]);
        let names = query.options_container().expression_attribute_names.unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names["#a"], "a");
        assert_eq!(names["#b"], "b");
    }

    #[test]
    fn test_partition_key_option_renders_key_condition() {
        let mut query = empty_query();
        query.set_partition_key("ID", bind("1"));

        let options = query.options_container();

        assert_eq!(
            options.key_condition_expression.as_deref(),
            Some("#ID = :partitionID")
        );
        assert_eq!(
            options.expression_attribute_names.unwrap()["#ID"],
            "ID"
        );
        assert_eq!(
            options.expression_attribute_values.unwrap()[":partitionID"],
            types::AttributeValue::S("1".to_string())
        );
        assert_eq!(options.partition_key.unwrap().0, "ID");
    }

    #[test]
    fn test_partition_key_then_begins_with_sort_key() {
        let mut query = empty_query();
        query.set_partition_key("ID", bind("1"));
        query.set_sort_key("Foo", bind("bar"), FilterMethod::BeginsWith);

        let options = query.options_container();

        assert_eq!(
            options.key_condition_expression.as_deref(),
            Some("#ID = :partitionID AND begins_with(#Foo, :sortKey)")
        );
    }

    #[test]
    fn test_spaces_stripped_from_placeholders() {
        let mut query = empty_query();
        query.set_partition_key("List ID", bind("1"));

        let options = query.options_container();

        assert_eq!(
            options.key_condition_expression.as_deref(),
            Some("#ListID = :partitionID")
        );
        assert_eq!(
            options.expression_attribute_names.unwrap()["#ListID"],
            "List ID"
        );
    }

    #[rstest]
    #[case::sort_key_filter(
        Filter::Field(
            FieldFilterKey::sort("Order"),
            FilterMethod::Equal,
            QueryValue::Bind(types::AttributeValue::N("2".to_string())),
        ),
        Some("#Order = :Order"),
        None
    )]
    #[case::partition_key_filter(
        Filter::Field(
            FieldFilterKey::partition("TodoID"),
            FilterMethod::Equal,
            QueryValue::Bind(types::AttributeValue::S("abc".to_string())),
        ),
        Some("#TodoID = :TodoID"),
        None
    )]
    #[case::plain_field_filter(
        Filter::Field(
            FieldFilterKey::new("Title"),
            FilterMethod::Equal,
            QueryValue::Bind(types::AttributeValue::S("Buy milk".to_string())),
        ),
        None,
        Some("#Title = :Title")
    )]
    #[case::plain_field_not_equal(
        Filter::Field(
            FieldFilterKey::new("Title"),
            FilterMethod::NotEqual,
            QueryValue::Bind(types::AttributeValue::S("Buy milk".to_string())),
        ),
        None,
        Some("#Title <> :Title")
    )]
    fn test_filter_routing(
        #[case] filter: Filter,
        #[case] key_condition: Option<&str>,
        #[case] filter_expression: Option<&str>,
    ) {
        let mut query = empty_query();
        query.filters.push(filter);

        let options = query.options_container();

        assert_eq!(options.key_condition_expression.as_deref(), key_condition);
        assert_eq!(options.filter_expression.as_deref(), filter_expression);
    }

    #[test]
    fn test_multiple_filters_join_with_and() {
        let mut query = empty_query();
        query.filters.extend([
            Filter::Field(
                FieldFilterKey::new("Title"),
                FilterMethod::Equal,
                bind("Buy milk"),
            ),
            Filter::Field(
                FieldFilterKey::new("Completed"),
                FilterMethod::NotEqual,
                QueryValue::Bind(types::AttributeValue::Bool(true)),
            ),
        ]);

        let options = query.options_container();

        assert_eq!(
            options.filter_expression.as_deref(),
            Some("#Title = :Title AND #Completed <> :Completed")
        );
    }

    #[rstest]
    #[case::key_override(FieldFilterKey::sort("Order"))]
    #[case::partition_flag(FieldFilterKey::partition("ID"))]
    #[should_panic(expected = "not-equal comparison")]
    fn test_not_equal_on_key_condition_panics(#[case] field_key: FieldFilterKey) {
        let mut query = empty_query();
        query.filters.push(Filter::Field(
            field_key,
            FilterMethod::NotEqual,
            bind("x"),
        ));
        let _ = query.options_container();
    }

    #[test]
    #[should_panic(expected = "not-equal comparison")]
    fn test_not_equal_sort_key_override_panics() {
        let mut query = empty_query();
        query.set_sort_key("Order", bind("2"), FilterMethod::NotEqual);
        let _ = query.options_container();
    }
}
