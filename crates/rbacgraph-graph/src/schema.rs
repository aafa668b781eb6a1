//! Neo4j schema initialization.

use neo4rs::Query;
use tracing::info;

use crate::client::GraphClient;
use crate::error::StoreResult;

/// Cypher statements for schema initialization.
const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE CONSTRAINT node_id IF NOT EXISTS FOR (n:NODE) REQUIRE n.id IS UNIQUE",
];

/// Initialize the Neo4j schema.
///
/// Safe to run multiple times - uses IF NOT EXISTS clauses.
pub async fn initialize_schema(client: &GraphClient) -> StoreResult<()> {
    for statement in SCHEMA_STATEMENTS {
        client.execute(Query::new(statement.to_string())).await?;
    }

    info!("Neo4j schema initialized ({} statements)", SCHEMA_STATEMENTS.len());
    Ok(())
}
