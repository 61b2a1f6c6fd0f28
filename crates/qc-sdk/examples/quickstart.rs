//! Quick start example for qc-sdk.

use qc_sdk::{GraphDb, Quad, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("quadcore SDK Quick Start");
    println!("=========================\n");

    let db = GraphDb::in_memory();
    println!("✓ Created in-memory database");

    db.insert_all([
        Quad::new(
            Value::iri("http://example.org/alice")?,
            Value::iri("http://xmlns.com/foaf/0.1/name")?,
            Value::string("Alice"),
            None,
        ),
        Quad::new(
            Value::iri("http://example.org/alice")?,
            Value::iri("http://xmlns.com/foaf/0.1/knows")?,
            Value::iri("http://example.org/bob")?,
            None,
        ),
        Quad::new(
            Value::iri("http://example.org/bob")?,
            Value::iri("http://xmlns.com/foaf/0.1/name")?,
            Value::string("Bob"),
            None,
        ),
    ])?;

    println!("✓ Inserted {} quads", db.count());

    db.remove_node(&Value::iri("http://example.org/bob")?)?;
    println!("✓ Swept every quad mentioning bob, {} quads remain", db.count());

    Ok(())
}
