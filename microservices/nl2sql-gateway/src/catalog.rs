//! Schema catalog introspection and prompt serialization

use tabula_core::{KeyRole, Result, SchemaCatalog, TableDescriptor, TabulaError};
use tabula_sqldb::{Database, SqlDbError};
use tracing::{info, instrument};

const PRIMARY_MARKER: &str = " 🔑";
const INDEXED_MARKER: &str = " 🔗";

/// Test the connection, then describe every table.
///
/// Any failure along the way is a connectivity failure: a half-read catalog
/// is never returned.
#[instrument(skip(db))]
pub async fn introspect(db: &dyn Database) -> Result<SchemaCatalog> {
    db.ping().await.map_err(connectivity)?;

    let names = db.list_tables().await.map_err(connectivity)?;
    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let columns = db.describe_table(&name).await.map_err(connectivity)?;
        tables.push(TableDescriptor::new(name, columns));
    }

    let catalog = SchemaCatalog::from_tables(tables);
    info!(tables = catalog.len(), "Schema introspected");
    Ok(catalog)
}

fn connectivity(err: SqlDbError) -> TabulaError {
    TabulaError::Connectivity(err.to_string())
}

/// Render the catalog as `TABLE:` / `COLUMNS:` blocks separated by blank lines
pub fn serialize(catalog: &SchemaCatalog) -> String {
    catalog
        .tables()
        .iter()
        .map(serialize_table)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn serialize_table(table: &TableDescriptor) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|col| {
            let marker = match col.key_role {
                KeyRole::Primary => PRIMARY_MARKER,
                KeyRole::ForeignOrIndexed => INDEXED_MARKER,
                KeyRole::None => "",
            };
            format!("{} ({}){}", col.name, col.declared_type, marker)
        })
        .collect();

    format!("TABLE: {}\nCOLUMNS: {}", table.name, columns.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeDatabase;
    use tabula_core::ColumnDescriptor;

    fn company_catalog() -> SchemaCatalog {
        SchemaCatalog::from_tables(vec![
            TableDescriptor::new(
                "employees",
                vec![
                    ColumnDescriptor::new("employeeNumber", "integer", KeyRole::Primary),
                    ColumnDescriptor::new("lastName", "character varying(50)", KeyRole::None),
                    ColumnDescriptor::new("officeCode", "character varying(10)", KeyRole::ForeignOrIndexed),
                ],
            ),
            TableDescriptor::new(
                "offices",
                vec![ColumnDescriptor::new("officeCode", "character varying(10)", KeyRole::Primary)],
            ),
        ])
    }

    #[test]
    fn test_serialize_blocks_in_catalog_order() {
        let text = serialize(&company_catalog());
        assert_eq!(
            text,
            "TABLE: employees\n\
             COLUMNS: employeeNumber (integer) 🔑, lastName (character varying(50)), officeCode (character varying(10)) 🔗\n\
             \n\
             TABLE: offices\n\
             COLUMNS: officeCode (character varying(10)) 🔑"
        );
    }

    #[test]
    fn test_serialize_is_stable() {
        let catalog = company_catalog();
        assert_eq!(serialize(&catalog), serialize(&catalog));
        assert_eq!(serialize(&SchemaCatalog::empty()), "");
    }

    #[tokio::test]
    async fn test_introspect_reads_every_table() {
        let db = FakeDatabase::company();
        let catalog = introspect(&db).await.unwrap();
        let names: Vec<&str> = catalog.table_names().collect();
        assert_eq!(names, db.table_names());
        assert_eq!(
            catalog.get("employees").unwrap().primary_key().next().unwrap().name,
            "employeeNumber"
        );
    }

    #[tokio::test]
    async fn test_introspect_unreachable_is_connectivity_error() {
        let db = FakeDatabase::unreachable();
        let err = introspect(&db).await.unwrap_err();
        assert!(matches!(err, TabulaError::Connectivity(_)));
    }
}
