pub(crate) const PARTITIONED_TABLE_QUERY: &str = r#"
SELECT
  c.relname AS table_name,
  pt.partstrat::text AS strategy
FROM pg_catalog.pg_partitioned_table pt
INNER JOIN pg_catalog.pg_class c ON c.oid = pt.partrelid
WHERE c.relname = $1;
"#;

pub(crate) const PARTITION_KEY_QUERY: &str = r#"
SELECT
  a.attname::text AS column_name
FROM pg_catalog.pg_partitioned_table pt
INNER JOIN pg_catalog.pg_class c ON c.oid = pt.partrelid
CROSS JOIN LATERAL unnest(pt.partattrs::int2[]) WITH ORDINALITY AS k(attnum, position)
INNER JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = k.attnum
WHERE c.relname = $1
ORDER BY k.position ASC;
"#;

pub(crate) const PARTITIONS_QUERY: &str = r#"
SELECT
  child.relname::text AS table_name,
  pg_catalog.pg_get_expr(child.relpartbound, child.oid) AS partition_bound,
  d.description AS comment
FROM pg_catalog.pg_inherits i
INNER JOIN pg_catalog.pg_class parent ON i.inhparent = parent.oid
INNER JOIN pg_catalog.pg_class child ON i.inhrelid = child.oid
LEFT JOIN pg_catalog.pg_description d
  ON d.objoid = child.oid
  AND d.classoid = 'pg_catalog.pg_class'::regclass
  AND d.objsubid = 0
WHERE parent.relname = $1
ORDER BY child.relname ASC;
"#;

pub(crate) const TABLE_LOCKS_QUERY: &str = r#"
SELECT
  n.nspname::text AS schema_name,
  t.relname::text AS table_name,
  l.mode AS lock_mode
FROM pg_catalog.pg_locks l
INNER JOIN pg_catalog.pg_class t ON t.oid = l.relation
INNER JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
WHERE t.relnamespace >= 2200
ORDER BY n.nspname ASC, t.relname ASC, l.mode ASC;
"#;

pub(crate) const SCHEMA_EXISTS_QUERY: &str = r#"
SELECT
  n.nspname::text AS schema_name
FROM pg_catalog.pg_namespace n
WHERE n.nspname = $1;
"#;
