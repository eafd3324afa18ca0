use minidb::ast::{ComparisonOp, Condition};
use minidb::{Config, Database, Value};
use proptest::prelude::*;

/// One mutation applied identically to every database under test.
#[derive(Debug, Clone)]
enum Mutation {
    Insert { age: i64, name: u8, flag: bool },
    Update { op: ComparisonOp, pivot: i64, age: i64 },
    SetFlag { op: ComparisonOp, pivot: i64, flag: bool },
    Delete { op: ComparisonOp, pivot: i64 },
    DeleteFlagged { flag: bool },
}

impl Mutation {
    fn sql(&self, next_id: &mut i64) -> String {
        match self {
            Mutation::Insert { age, name, flag } => {
                *next_id += 1;
                format!("INSERT INTO t VALUES ({next_id}, 'n{name}', {age}, {flag})")
            }
            Mutation::Update { op, pivot, age } => {
                format!("UPDATE t SET age = {age} WHERE age {op} {pivot}")
            }
            Mutation::SetFlag { op, pivot, flag } => {
                format!("UPDATE t SET flag = {flag} WHERE age {op} {pivot}")
            }
            Mutation::Delete { op, pivot } => format!("DELETE FROM t WHERE age {op} {pivot}"),
            Mutation::DeleteFlagged { flag } => format!("DELETE FROM t WHERE flag = {flag}"),
        }
    }
}

fn arb_op() -> impl Strategy<Value = ComparisonOp> {
    prop::sample::select(ComparisonOp::ALL.to_vec())
}

fn arb_mutation() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        4 => (0i64..20, 0u8..5, any::<bool>())
            .prop_map(|(age, name, flag)| Mutation::Insert { age, name, flag }),
        1 => (arb_op(), 0i64..20, 0i64..20)
            .prop_map(|(op, pivot, age)| Mutation::Update { op, pivot, age }),
        1 => (arb_op(), 0i64..20, any::<bool>())
            .prop_map(|(op, pivot, flag)| Mutation::SetFlag { op, pivot, flag }),
        1 => (arb_op(), 0i64..20).prop_map(|(op, pivot)| Mutation::Delete { op, pivot }),
        1 => any::<bool>().prop_map(|flag| Mutation::DeleteFlagged { flag }),
    ]
}

/// Builds the same table twice: once answering WHERE through the indices,
/// once through scans.
fn build(mutations: &[Mutation]) -> (Database, Database) {
    let mut indexed = Database::new();
    let mut scanned = Database::with_config(Config::scan_only());
    let mut next_id = 0;

    for db in [&mut indexed, &mut scanned] {
        db.execute("CREATE TABLE t (id INT, name VARCHAR(8), age INT, flag BOOLEAN)")
            .unwrap();
    }
    for mutation in mutations {
        let sql = mutation.sql(&mut next_id);
        let a = indexed.execute(&sql).unwrap();
        let b = scanned.execute(&sql).unwrap();
        assert_eq!(a, b, "{sql}");
    }
    (indexed, scanned)
}

proptest! {
    #[test]
    fn index_and_scan_agree_for_every_operator(
        mutations in prop::collection::vec(arb_mutation(), 0..40),
        pivot in -2i64..22,
    ) {
        let (indexed, scanned) = build(&mutations);
        let table = indexed.get_table("t").unwrap();

        for op in ComparisonOp::ALL {
            let condition = Condition {
                column: "age".into(),
                op,
                value: Value::Int(pivot),
            };
            prop_assert_eq!(
                table.matching(&condition, true).unwrap(),
                table.matching(&condition, false).unwrap()
            );

            let sql = format!("SELECT * FROM t WHERE age {op} {pivot}");
            prop_assert_eq!(indexed.query(&sql).unwrap(), scanned.query(&sql).unwrap());

            let sql = format!("SELECT id FROM t WHERE name {op} 'n2' ORDER BY age");
            prop_assert_eq!(indexed.query(&sql).unwrap(), scanned.query(&sql).unwrap());
        }
    }

    #[test]
    fn boolean_index_and_scan_agree(
        mutations in prop::collection::vec(arb_mutation(), 0..40),
        pivot in 0i64..20,
    ) {
        let (indexed, scanned) = build(&mutations);
        let table = indexed.get_table("t").unwrap();

        for op in ComparisonOp::ALL {
            for literal in [true, false] {
                let condition = Condition {
                    column: "flag".into(),
                    op,
                    value: Value::Bool(literal),
                };
                prop_assert_eq!(
                    table.matching(&condition, true).unwrap(),
                    table.matching(&condition, false).unwrap()
                );

                let sql = format!("SELECT * FROM t WHERE flag {op} {literal} ORDER BY name");
                prop_assert_eq!(indexed.query(&sql).unwrap(), scanned.query(&sql).unwrap());

                let sql = format!("SELECT id FROM t WHERE flag {op} {literal} OR age < {pivot}");
                prop_assert_eq!(indexed.query(&sql).unwrap(), scanned.query(&sql).unwrap());
            }
        }

        let sql = "SELECT id, flag FROM t ORDER BY flag";
        prop_assert_eq!(indexed.query(sql).unwrap(), scanned.query(sql).unwrap());
    }

    #[test]
    fn not_equal_to_sentinel_returns_every_live_row(
        mutations in prop::collection::vec(arb_mutation(), 0..60),
    ) {
        let (indexed, _) = build(&mutations);
        let table = indexed.get_table("t").unwrap();
        let live = table.row_ids();

        prop_assert_eq!(live.len(), table.row_count());
        for (column, sentinel) in [
            ("id", Value::Int(i64::MIN)),
            ("name", Value::from("")),
            ("age", Value::Int(-1)),
        ] {
            let index = table.index(column).unwrap();
            prop_assert_eq!(index.lookup(ComparisonOp::NotEq, &sentinel).unwrap(), live.clone());
            prop_assert_eq!(index.all(), live.clone());
        }

        // a BOOLEAN column has no free value, so its two keys must cover every row
        let flags = table.index("flag").unwrap();
        let mut covered = flags.lookup(ComparisonOp::Eq, &Value::Bool(true)).unwrap();
        covered.extend(flags.lookup(ComparisonOp::Eq, &Value::Bool(false)).unwrap());
        prop_assert_eq!(covered, live.clone());
        prop_assert_eq!(flags.all(), live);
    }

    #[test]
    fn stored_rows_round_trip(ages in prop::collection::vec(-1000i64..1000, 1..30)) {
        let mut db = Database::new();
        db.execute("CREATE TABLE t (id INT, age INT)").unwrap();
        for (id, age) in ages.iter().enumerate() {
            db.execute(&format!("INSERT INTO t VALUES ({id}, {age})")).unwrap();
        }

        let result = db.query("SELECT * FROM t").unwrap();
        let stored: Vec<i64> = result.rows.iter().filter_map(|row| row[1].as_int()).collect();
        prop_assert_eq!(stored, ages.clone());

        let result = db.query("SELECT age FROM t ORDER BY age").unwrap();
        let mut sorted = ages;
        sorted.sort();
        let ordered: Vec<i64> = result.rows.iter().filter_map(|row| row[0].as_int()).collect();
        prop_assert_eq!(ordered, sorted);
    }

    #[test]
    fn order_by_text_is_stable(names in prop::collection::vec(0u8..4, 1..30)) {
        let mut db = Database::new();
        db.execute("CREATE TABLE t (id INT, name VARCHAR(8))").unwrap();
        for (id, name) in names.iter().enumerate() {
            db.execute(&format!("INSERT INTO t VALUES ({id}, 'n{name}')")).unwrap();
        }

        let mut expected: Vec<(String, i64)> = names
            .iter()
            .enumerate()
            .map(|(id, name)| (format!("n{name}"), id as i64))
            .collect();
        expected.sort_by(|a, b| a.0.cmp(&b.0));

        let result = db.query("SELECT name, id FROM t ORDER BY name").unwrap();
        let ordered: Vec<(String, i64)> = result
            .rows
            .iter()
            .filter_map(|row| Some((row[0].as_str()?.to_string(), row[1].as_int()?)))
            .collect();
        prop_assert_eq!(ordered, expected);
    }
}
