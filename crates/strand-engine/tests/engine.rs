use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use strand_db::{Database, Dialect, MockSqlClient};
use strand_engine::{DirOptions, Engine, Fetch, PathContext, TemplateContext};
use strand_format::{MarkdownFormatter, Row};
use tempfile::TempDir;

/// Fetcher answering every URL with a fixed body.
#[derive(Debug, Default)]
struct StubFetcher {
    body: String,
    requested: Arc<Mutex<Vec<String>>>,
}

impl Fetch for StubFetcher {
    fn fetch(&self, url: &str) -> String {
        self.requested.lock().unwrap().push(url.to_owned());
        self.body.clone()
    }
}

fn write(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Project root with a `docs/` doc root.
fn project() -> (TempDir, Engine) {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::create_dir(temp_dir.path().join("docs")).unwrap();
    let paths = PathContext::new(temp_dir.path(), temp_dir.path().join("docs")).unwrap();
    let engine = Engine::builder(paths)
        .fetcher(StubFetcher::default())
        .build();
    (temp_dir, engine)
}

fn docs(temp_dir: &TempDir) -> std::path::PathBuf {
    temp_dir.path().join("docs")
}

#[test]
fn test_nested_import_concatenates_in_call_order() {
    let (temp_dir, engine) = project();
    write(
        &docs(&temp_dir),
        "a.tpl",
        "A start\n{{ engine.import(\"b.tpl\", {\"name\": \"Ada\"}) }}A end\n",
    );
    write(
        &docs(&temp_dir),
        "b.tpl",
        "B says {{ name }} {{ engine.escape(\"a_b\") }}\n",
    );

    let output = engine.import("a.tpl", TemplateContext::new());

    assert_eq!(output, "A start\nB says Ada a\\_b\nA end\n");
}

#[test]
fn test_import_passes_context_variables() {
    let (temp_dir, engine) = project();
    write(&docs(&temp_dir), "page.tpl", "# {{ title }} ({{ level }})\n");

    let context = TemplateContext::new().with("title", "Intro").with("level", 2);
    let output = engine.import("page.tpl", context);

    assert_eq!(output, "# Intro (2)\n");
}

#[test]
fn test_caller_supplied_engine_key_wins() {
    let (temp_dir, engine) = project();
    write(&docs(&temp_dir), "who.tpl", "{{ engine }}");
    write(
        &docs(&temp_dir),
        "outer.tpl",
        "{{ engine.import(\"who.tpl\", {\"engine\": \"custom\"}) }}",
    );

    assert_eq!(
        engine.import("who.tpl", TemplateContext::new().with("engine", "mine")),
        "mine"
    );
    assert_eq!(engine.import("outer.tpl", TemplateContext::new()), "custom");
}

#[test]
fn test_import_missing_file_renders_inline_error() {
    let (temp_dir, engine) = project();
    write(
        &docs(&temp_dir),
        "page.tpl",
        "before\n{{ engine.import(\"missing.tpl\") }}after\n",
    );

    let output = engine.import("page.tpl", TemplateContext::new());

    let missing = docs(&temp_dir).join("missing.tpl");
    assert_eq!(
        output,
        format!("before\nFile read error: {}\nafter\n", missing.display())
    );
}

#[test]
fn test_import_resolves_against_doc_root() {
    let (temp_dir, engine) = project();
    write(temp_dir.path(), "page.tpl", "project copy");
    write(&docs(&temp_dir), "page.tpl", "doc copy");

    assert_eq!(engine.import("page.tpl", TemplateContext::new()), "doc copy");
}

#[test]
fn test_import_cycle_is_reported() {
    let (temp_dir, engine) = project();
    write(&docs(&temp_dir), "a.tpl", "[a]{{ engine.import(\"b.tpl\") }}");
    write(&docs(&temp_dir), "b.tpl", "[b]{{ engine.import(\"a.tpl\") }}");

    let output = engine.import("a.tpl", TemplateContext::new());

    assert_eq!(
        output,
        "[a][b]Import cycle detected: a.tpl -> b.tpl -> a.tpl\n"
    );
}

#[test]
fn test_self_import_is_a_cycle() {
    let (temp_dir, engine) = project();
    write(&docs(&temp_dir), "self.tpl", "{{ engine.import(\"self.tpl\") }}");

    assert_eq!(
        engine.import("self.tpl", TemplateContext::new()),
        "Import cycle detected: self.tpl -> self.tpl\n"
    );
}

#[test]
fn test_import_depth_limit() {
    let temp_dir = tempfile::tempdir().unwrap();
    let paths = PathContext::new(temp_dir.path(), temp_dir.path()).unwrap();
    let engine = Engine::builder(paths).max_import_depth(2).build();
    write(temp_dir.path(), "a.tpl", "a>{{ engine.import(\"b.tpl\") }}");
    write(temp_dir.path(), "b.tpl", "b>{{ engine.import(\"c.tpl\") }}");
    write(temp_dir.path(), "c.tpl", "c");

    assert_eq!(
        engine.import("a.tpl", TemplateContext::new()),
        "a>b>Import depth limit (2) exceeded at c.tpl\n"
    );
    // The stack unwinds, so a shallower import still works
    assert_eq!(engine.import("b.tpl", TemplateContext::new()), "b>c");
}

#[test]
fn test_same_template_imported_twice_is_not_a_cycle() {
    let (temp_dir, engine) = project();
    write(&docs(&temp_dir), "item.tpl", "*");
    write(
        &docs(&temp_dir),
        "list.tpl",
        "{{ engine.import(\"item.tpl\") }}{{ engine.import(\"item.tpl\") }}",
    );

    assert_eq!(engine.import("list.tpl", TemplateContext::new()), "**");
}

#[test]
fn test_template_error_renders_inline() {
    let (temp_dir, engine) = project();
    write(&docs(&temp_dir), "bad.tpl", "{{ unclosed ");

    let output = engine.import("bad.tpl", TemplateContext::new());

    assert!(output.starts_with("Template error in "), "got: {output}");
    assert!(output.contains("bad.tpl"));
    assert!(output.ends_with('\n'));
}

#[test]
fn test_file_is_never_evaluated() {
    let (temp_dir, engine) = project();
    write(temp_dir.path(), "src/raw.md.tpl", "{{ 1 + 1 }} {% if x %}");
    write(
        &docs(&temp_dir),
        "page.tpl",
        "{{ engine.file(\"src/raw.md.tpl\") }}",
    );

    assert_eq!(engine.file("src/raw.md.tpl"), "{{ 1 + 1 }} {% if x %}");
    assert_eq!(
        engine.import("page.tpl", TemplateContext::new()),
        "{{ 1 + 1 }} {% if x %}"
    );
}

#[test]
fn test_file_missing_and_lossy() {
    let (temp_dir, engine) = project();
    fs::write(temp_dir.path().join("latin1.txt"), [b'f', 0xff]).unwrap();

    assert_eq!(engine.file("latin1.txt"), "f\u{FFFD}");
    assert_eq!(
        engine.file("nope.txt"),
        format!(
            "File read error: {}\n",
            temp_dir.path().join("nope.txt").display()
        )
    );
}

#[test]
fn test_file_url_goes_through_fetcher() {
    let temp_dir = tempfile::tempdir().unwrap();
    let requested = Arc::new(Mutex::new(Vec::new()));
    let fetcher = StubFetcher {
        body: "remote body".to_owned(),
        requested: Arc::clone(&requested),
    };
    let engine = Engine::builder(PathContext::from_input(&temp_dir.path().join("x")).unwrap())
        .fetcher(fetcher)
        .build();

    assert_eq!(engine.file("https://example.com/a.md"), "remote body");
    assert_eq!(
        *requested.lock().unwrap(),
        vec!["https://example.com/a.md".to_owned()]
    );
}

#[test]
fn test_dir_from_template() {
    let (temp_dir, engine) = project();
    write(temp_dir.path(), "tree/alpha.txt", "");
    write(temp_dir.path(), "tree/Zeta/z.txt", "");
    write(temp_dir.path(), "tree/Beta/b.txt", "");
    write(
        &docs(&temp_dir),
        "page.tpl",
        "{{ engine.dir(\"tree\", depth=1) }}",
    );

    assert_eq!(
        engine.import("page.tpl", TemplateContext::new()),
        "📂 Beta\n📂 Zeta\n📄 alpha.txt\n"
    );
    assert_eq!(
        engine.dir("tree", &DirOptions::default()),
        "📂 Beta\n    📄 b.txt\n📂 Zeta\n    📄 z.txt\n📄 alpha.txt\n"
    );
}

#[test]
fn test_dir_positional_arguments() {
    let (temp_dir, engine) = project();
    write(temp_dir.path(), "tree/alpha.txt", "");
    write(temp_dir.path(), "tree/Beta/b.txt", "");
    write(temp_dir.path(), "tree/skip/s.txt", "");
    write(
        &docs(&temp_dir),
        "page.tpl",
        "{{ engine.dir(\"tree\", 1) }}--\n{{ engine.dir(\"tree\", 2, [\"skip\"], 1) }}",
    );

    assert_eq!(
        engine.import("page.tpl", TemplateContext::new()),
        "📂 Beta\n📂 skip\n📄 alpha.txt\n--\n    📂 Beta\n        📄 b.txt\n    📄 alpha.txt\n"
    );
}

#[test]
fn test_filters_use_formatter() {
    let (temp_dir, engine) = project();
    write(
        &docs(&temp_dir),
        "page.tpl",
        "{{ name | md_escape }} {{ missing | sanitize }} {{ long | limit(3) }} {{ long | sanitize(2) }}",
    );

    let context = TemplateContext::new()
        .with("name", "a*b")
        .with("long", "abcdef");
    let output = engine.import("page.tpl", context);

    assert_eq!(output, "a\\*b NULL abc... ab...");
}

#[test]
fn test_table_helper() {
    let (temp_dir, engine) = project();
    write(
        &docs(&temp_dir),
        "page.tpl",
        "{{ engine.table([{\"id\": 1, \"name\": \"A-B\"}, {\"id\": 2, \"name\": none}]) }}",
    );

    assert_eq!(
        engine.import("page.tpl", TemplateContext::new()),
        "| id | name |\n| --- | --- |\n| 1 | A-B |\n| 2 | NULL |\n"
    );
}

#[test]
fn test_table_columns_follow_key_order() {
    let (temp_dir, engine) = project();
    write(
        &docs(&temp_dir),
        "page.tpl",
        "{{ engine.table([{\"name\": \"A\", \"id\": 1, \"created\": \"2024\"}]) }}",
    );

    assert_eq!(
        engine.import("page.tpl", TemplateContext::new()),
        "| name | id | created |\n| --- | --- | --- |\n| A | 1 | 2024 |\n"
    );
}

#[test]
fn test_table_without_rows() {
    let (temp_dir, engine) = project();
    write(&docs(&temp_dir), "page.tpl", "[{{ engine.table([]) }}]");

    assert_eq!(
        engine.import("page.tpl", TemplateContext::new()),
        "[No results found.\n]"
    );
    assert_eq!(engine.table(&[], 10), strand_engine::NO_ROWS);
}

#[test]
fn test_roots_are_exposed() {
    let (temp_dir, engine) = project();
    write(
        &docs(&temp_dir),
        "page.tpl",
        "{{ engine.project_root() }}|{{ engine.doc_root() }}",
    );

    assert_eq!(
        engine.import("page.tpl", TemplateContext::new()),
        format!(
            "{}|{}",
            temp_dir.path().display(),
            docs(&temp_dir).display()
        )
    );
}

#[test]
fn test_unknown_engine_method() {
    let (temp_dir, engine) = project();
    write(&docs(&temp_dir), "page.tpl", "{{ engine.eval(\"1\") }}");

    let output = engine.import("page.tpl", TemplateContext::new());

    assert!(output.starts_with("Template error in "));
    assert!(output.contains("eval"));
}

#[test]
fn test_invalid_table_name_issues_no_query() {
    let temp_dir = tempfile::tempdir().unwrap();
    let client = MockSqlClient::new(Dialect::MySql);
    let log = client.log();
    let database = Database::new(Arc::new(MarkdownFormatter::new())).with_client(client);
    let engine = Engine::builder(PathContext::new(temp_dir.path(), temp_dir.path()).unwrap())
        .database(database)
        .build();
    write(
        temp_dir.path(),
        "page.tpl",
        "{{ engine.describe_full_table(\"users; DROP TABLE x\", indexes=true, sample=5) }}",
    );

    let output = engine.import("page.tpl", TemplateContext::new());

    assert!(output.starts_with("Invalid table name: "), "got: {output}");
    assert!(log.statements().is_empty());
}

#[test]
fn test_describe_full_table_from_template() {
    let temp_dir = tempfile::tempdir().unwrap();
    let client = MockSqlClient::new(Dialect::MySql)
        .with_rows(
            "DESCRIBE `users`",
            vec![
                Row::new()
                    .with_value("Field", "id")
                    .with_value("Type", "int"),
            ],
        )
        .with_rows(
            "SELECT * FROM `users` LIMIT 1",
            vec![Row::new().with_value("id", "1")],
        );
    let log = client.log();
    let database = Database::new(Arc::new(MarkdownFormatter::new())).with_client(client);
    let engine = Engine::builder(PathContext::new(temp_dir.path(), temp_dir.path()).unwrap())
        .database(database)
        .build();
    write(
        temp_dir.path(),
        "page.tpl",
        "{{ engine.describe_full_table(\"users\", mode=\"describe\", sample=1) }}",
    );

    let output = engine.import("page.tpl", TemplateContext::new());

    assert_eq!(
        output,
        "## Table: `users`\n\n\
         ### Table Structure\n\
         | Field | Type |\n| --- | --- |\n| id | int |\n\n\
         ### First 1 Records\n\
         | id |\n| --- |\n| 1 |\n\n"
    );
    assert_eq!(
        log.statements(),
        vec!["DESCRIBE `users`", "SELECT * FROM `users` LIMIT 1"]
    );
}

#[test]
fn test_describe_full_table_positional_arguments() {
    let temp_dir = tempfile::tempdir().unwrap();
    let client = MockSqlClient::new(Dialect::MySql)
        .with_rows(
            "DESCRIBE `users`",
            vec![Row::new().with_value("Field", "id")],
        )
        .with_rows(
            "SELECT * FROM `users` LIMIT 2",
            vec![Row::new().with_value("id", "1")],
        );
    let log = client.log();
    let database = Database::new(Arc::new(MarkdownFormatter::new())).with_client(client);
    let engine = Engine::builder(PathContext::new(temp_dir.path(), temp_dir.path()).unwrap())
        .database(database)
        .build();
    write(
        temp_dir.path(),
        "page.tpl",
        "{{ engine.describe_full_table(\"users\", \"describe\", false, 2) }}",
    );

    engine.import("page.tpl", TemplateContext::new());

    assert_eq!(
        log.statements(),
        vec!["DESCRIBE `users`", "SELECT * FROM `users` LIMIT 2"]
    );
}

#[test]
fn test_database_not_connected() {
    let (temp_dir, engine) = project();
    write(&docs(&temp_dir), "page.tpl", "{{ engine.query(\"SELECT 1\") }}");

    assert_eq!(
        engine.import("page.tpl", TemplateContext::new()),
        "Database connection is not set. Use connect.\n"
    );
}
