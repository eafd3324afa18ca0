use minidb::{Database, ExecResult};
use tracing_subscriber::EnvFilter;

const SCRIPT: &[&str] = &[
    "CREATE TABLE users (id INT, name VARCHAR(50), age INT, active BOOLEAN)",
    "INSERT INTO users VALUES (1, 'Alice', 30, TRUE), (2, 'Bob', 25, FALSE)",
    "INSERT INTO users (name, id, age, active) VALUES ('Carol', 3, 41, TRUE)",
    "SELECT * FROM users WHERE age > 25",
    "UPDATE users SET active = TRUE WHERE name = 'Bob'",
    "SELECT name, age FROM users WHERE active = TRUE ORDER BY age LIMIT 2",
    "DELETE FROM users WHERE age >= 40 OR id = 2",
    "SELECT * FROM users",
    "SELECT * FROM users WHERE age > 1 AND id = 1 OR id = 2",
];

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let mut db = Database::new();
    for sql in SCRIPT {
        println!("> {sql}");
        match db.execute(sql) {
            Ok(ExecResult::Rows(result)) => {
                println!("{}", result.columns.join(" | "));
                for row in &result.rows {
                    let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
                    println!("{}", cells.join(" | "));
                }
                println!("({} rows)", result.count);
            }
            Ok(ExecResult::Affected(n)) => println!("ok, {n} affected"),
            Err(err) => println!("error: {err}"),
        }
    }

    match db.describe_table("users") {
        Ok(info) => println!(
            "users: {} rows, {} bytes on the heap",
            info.row_count, info.heap_bytes
        ),
        Err(err) => println!("error: {err}"),
    }
}
