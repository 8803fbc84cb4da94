//! Query execution against the store client.
//!
//! [`Database`] maps a logical [`query::Action`] to the matching low-level
//! request shape and wraps the raw response rows in a
//! [`output::DatabaseOutput`]. Store-side failures are surfaced verbatim for
//! the caller's own retry policy; this layer performs no retries and holds
//! no state across calls.

pub(crate) mod inputs;

/// The output envelope handed to the decoder.
pub mod output;

use crate::{error, query};

use aws_sdk_dynamodb::{Client, types};

/// A handle to a DynamoDB-backed table store.
#[derive(Clone, Debug)]
pub struct Database {
    client: Client,
}

impl Database {
    /// Wrap a store client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The underlying store client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Execute a query and interpret its raw response.
    ///
    /// Read actions resolve to a scan or an indexed query per the query's
    /// accumulated keys; the delete actions produce no payload.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "dynamodb_mapper.execute",
            skip(self, query),
            fields(table = %query.schema.table_name, action = ?query.action),
            err
        )
    )]
    pub async fn execute(
        &self,
        query: query::DynamoQuery,
    ) -> Result<Option<output::DatabaseOutput>, error::Error> {
        match query.action {
            query::Action::Read | query::Action::Scan | query::Action::Query => {
                self.read(query).await.map(Some)
            }
            query::Action::Create => self.create(query).await.map(Some),
            query::Action::Update => self.update(query).await.map(Some),
            query::Action::Delete => self.delete(query).await.map(|()| None),
            query::Action::BatchCreate => self.batch_create(query).await.map(Some),
            query::Action::BatchDelete => self.batch_delete(query).await.map(|()| None),
        }
    }

    async fn read(
        &self,
        query: query::DynamoQuery,
    ) -> Result<output::DatabaseOutput, error::Error> {
        if inputs::should_use_scan(&query) {
            let input = inputs::ScanInput::from(&query);
            let response = self
                .client
                .scan()
                .set_consistent_read(input.consistent_read)
                .set_exclusive_start_key(input.exclusive_start_key)
                .set_expression_attribute_names(input.expression_attribute_names)
                .set_expression_attribute_values(input.expression_attribute_values)
                .set_filter_expression(input.filter_expression)
                .set_index_name(input.index_name)
                .set_limit(input.limit)
                .set_projection_expression(input.projection_expression)
                .set_select(input.select)
                .table_name(input.table_name)
                .send()
                .await?;
            Ok(output::DatabaseOutput::List(
                response.items.unwrap_or_default(),
                response.last_evaluated_key,
            ))
        } else {
            let input = inputs::QueryInput::from(&query);
            let response = self
                .client
                .query()
                .key_condition_expression(input.key_condition_expression)
                .set_consistent_read(input.consistent_read)
                .set_exclusive_start_key(input.exclusive_start_key)
                .set_expression_attribute_names(input.expression_attribute_names)
                .set_expression_attribute_values(input.expression_attribute_values)
                .set_filter_expression(input.filter_expression)
                .set_index_name(input.index_name)
                .set_limit(input.limit)
                .set_projection_expression(input.projection_expression)
                .set_scan_index_forward(input.scan_index_forward)
                .set_select(input.select)
                .table_name(input.table_name)
                .send()
                .await?;
            Ok(output::DatabaseOutput::List(
                response.items.unwrap_or_default(),
                response.last_evaluated_key,
            ))
        }
    }

    async fn create(
        &self,
        query: query::DynamoQuery,
    ) -> Result<output::DatabaseOutput, error::Error> {
        let input = inputs::PutItemInput::from(&query);
        self.client
            .put_item()
            .set_item(Some(input.item.clone()))
            .set_condition_expression(input.condition_expression)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .table_name(input.table_name)
            .send()
            .await?;
        // The written item is the single-row output.
        Ok(output::DatabaseOutput::Single(input.item))
    }

    async fn update(
        &self,
        query: query::DynamoQuery,
    ) -> Result<output::DatabaseOutput, error::Error> {
        let input = inputs::UpdateItemInput::from(&query);
        let response = self
            .client
            .update_item()
            .set_key(Some(input.key))
            .set_attribute_updates(Some(input.attribute_updates))
            .set_condition_expression(input.condition_expression)
            .return_values(types::ReturnValue::AllNew)
            .set_return_consumed_capacity(input.return_consumed_capacity)
            .set_return_item_collection_metrics(input.return_item_collection_metrics)
            .table_name(input.table_name)
            .send()
            .await?;
        Ok(output::DatabaseOutput::Single(
            response.attributes.unwrap_or_default(),
        ))
    }

    async fn delete(&self, query: query::DynamoQuery) -> Result<(), error::Error> {
        let input = inputs::DeleteItemInput::from(&query);
        let delete_request = types::DeleteRequest::builder()
            .set_key(Some(input.key))
            .build()
            .unwrap();
        let write_request = types::WriteRequest::builder()
            .delete_request(delete_request)
            .build();
        self.client
            .batch_write_item()
            .request_items(input.table_name, vec![write_request])
            .send()
            .await?;
        Ok(())
    }

    async fn batch_create(
        &self,
        query: query::DynamoQuery,
    ) -> Result<output::DatabaseOutput, error::Error> {
        let input = inputs::BatchPutInput::from(&query);
        let write_requests = input
            .items
            .iter()
            .cloned()
            .map(|item| {
                let put_request = types::PutRequest::builder()
                    .set_item(Some(item))
                    .build()
                    .unwrap();
                types::WriteRequest::builder()
                    .put_request(put_request)
                    .build()
            })
            .collect();
        self.client
            .batch_write_item()
            .set_request_items(Some(std::collections::HashMap::from([(
                input.table_name,
                write_requests,
            )])))
            .send()
            .await?;
        Ok(output::DatabaseOutput::List(input.items, None))
    }

    async fn batch_delete(&self, query: query::DynamoQuery) -> Result<(), error::Error> {
        let input = inputs::BatchDeleteInput::from(&query);
        let write_requests = input
            .keys
            .into_iter()
            .map(|key| {
                let delete_request = types::DeleteRequest::builder()
                    .set_key(Some(key))
                    .build()
                    .unwrap();
                types::WriteRequest::builder()
                    .delete_request(delete_request)
                    .build()
            })
            .collect();
        self.client
            .batch_write_item()
            .set_request_items(Some(std::collections::HashMap::from([(
                input.table_name,
                write_requests,
            )])))
            .send()
            .await?;
        Ok(())
    }
}
