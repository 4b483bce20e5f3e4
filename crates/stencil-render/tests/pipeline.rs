//! Whole-pipeline scenarios: sources in, rendered text out.

use std::fs;
use std::sync::Arc;

use serde_json::json;
use serial_test::serial;
use stencil_render::{
    Config, Error, FunctionRegistry, Host, MockEnv, MockStdin, TemplateSource, Templates, Vars,
    VarsSource,
};

fn host() -> Host {
    Host::with_readers(MockEnv::new(), MockStdin::empty())
}

fn render(config: &Config, host: &Host) -> Result<String, Error> {
    let vars = config.build_vars(host)?;
    let templates = config.build_templates(Arc::new(FunctionRegistry::standard()), &vars, host)?;
    let mut out = Vec::new();
    templates.render(
        &config.template_out_exclude,
        &config.template_out_print_separator,
        &mut out,
    )?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn test_hello_world() {
    let mut config = Config::default();
    config.vars_sources.push(VarsSource::literal("name", "world"));
    config
        .template_sources
        .push(TemplateSource::literal("hello", "Hello {{ name }}"));
    assert_eq!(render(&config, &host()).unwrap(), "Hello world");
}

#[test]
fn test_later_file_overrides_earlier() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");
    fs::write(&first, r#"{"x": 1}"#).unwrap();
    fs::write(&second, r#"{"x": 2}"#).unwrap();

    let vars = Vars::from_sources(
        &[VarsSource::file(&first), VarsSource::file(&second)],
        &host(),
    )
    .unwrap();
    assert_eq!(serde_json::to_value(&vars).unwrap(), json!({"x": 2}));
}

#[test]
fn test_mixed_formats_share_one_namespace() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = dir.path().join("app.yaml");
    let toml = dir.path().join("db.toml");
    fs::write(&yaml, "name: shop\nreplicas: 3\n").unwrap();
    fs::write(&toml, "[primary]\nhost = \"db1\"\nport = 5432\n").unwrap();

    let mut config = Config::default();
    config.vars_sources.push(VarsSource::file(&yaml));
    config.vars_sources.push(VarsSource::file(&toml).under("db"));
    config.template_sources.push(TemplateSource::literal(
        "summary",
        "{{ name }} x{{ replicas }} -> {{ db.primary.host }}:{{ db.primary.port }}",
    ));
    assert_eq!(render(&config, &host()).unwrap(), "shop x3 -> db1:5432");
}

#[test]
fn test_namespace_replaces_scalar() {
    let vars = Vars::from_sources(
        &[
            VarsSource::literal("app", "plain"),
            VarsSource::literal("port", 80).under("app"),
        ],
        &host(),
    )
    .unwrap();
    assert_eq!(vars.get("app").unwrap(), &json!({"port": 80}));
}

#[test]
fn test_exclude_and_separator() {
    let mut config = Config::default();
    config.template_sources.push(TemplateSource::literal("a", "A"));
    config.template_sources.push(TemplateSource::literal("b", "B"));
    config.template_out_exclude = "a".to_string();
    config.template_out_print_separator = "|".to_string();
    assert_eq!(render(&config, &host()).unwrap(), "B");

    config.template_sources.push(TemplateSource::literal("c", "C"));
    assert_eq!(render(&config, &host()).unwrap(), "B|C");
}

#[test]
fn test_separator_sees_variables() {
    let mut config = Config::default();
    config.vars_sources.push(VarsSource::literal("sep", "--"));
    config.template_sources.push(TemplateSource::literal("a", "A"));
    config.template_sources.push(TemplateSource::literal("b", "B"));
    config.template_out_print_separator = "\n{{ sep }}\n".to_string();
    assert_eq!(render(&config, &host()).unwrap(), "A\n--\nB");
}

#[test]
fn test_file_glob_order_and_names() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("2-body.txt"), "body").unwrap();
    fs::write(dir.path().join("1-head.txt"), "head;").unwrap();

    let mut config = Config::default();
    config.template_sources.push(TemplateSource::file_glob(format!(
        "{}/*.txt",
        dir.path().display()
    )));

    let templates = config
        .build_templates(Arc::new(FunctionRegistry::standard()), &Vars::new(), &host())
        .unwrap();
    let expected: Vec<String> = ["1-head.txt", "2-body.txt"]
        .iter()
        .map(|f| dir.path().join(f).to_string_lossy().into_owned())
        .collect();
    assert_eq!(templates.names(), expected.as_slice());
    assert_eq!(render(&config, &host()).unwrap(), "head;body");
}

#[test]
fn test_map_unknown_function() {
    let mut config = Config::default();
    config
        .template_sources
        .push(TemplateSource::literal("t", r#"{{ map("nope", [1, 2, 3]) }}"#));
    let err = render(&config, &host()).unwrap_err();
    assert!(matches!(err, Error::NotFound { ref name } if name == "nope"), "{err}");
}

#[test]
fn test_higher_order_pipeline() {
    let mut config = Config::default();
    config
        .vars_sources
        .push(VarsSource::literal("hosts", json!(["web-1", "db-1", "web-2"])));
    config.template_sources.push(TemplateSource::literal(
        "t",
        r#"{{ join(",", map("upper", filter("hasPrefix", "web-", hosts))) }}"#,
    ));
    assert_eq!(render(&config, &host()).unwrap(), "WEB-1,WEB-2");
}

#[test]
fn test_slurped_files_filtered_by_glob() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.conf"), "alpha").unwrap();
    fs::write(dir.path().join("b.md"), "beta").unwrap();
    let root = dir.path().display();

    let mut config = Config::default();
    config
        .vars_sources
        .push(VarsSource::files_slurp(format!("{root}/*")).under("files"));
    config.template_sources.push(TemplateSource::literal(
        "t",
        format!(
            r#"{{% for path, text in glob(files, "{root}/*.conf") | items %}}{}{{% endfor %}}"#,
            "{{ text }}"
        ),
    ));
    assert_eq!(render(&config, &host()).unwrap(), "alpha");
}

#[test]
fn test_stdin_feeds_one_source() {
    let host = Host::with_readers(MockEnv::new(), MockStdin::piped("greeting: hi\n"));
    let mut config = Config::default();
    config.vars_sources.push(VarsSource::stdin());
    config
        .template_sources
        .push(TemplateSource::literal("t", "{{ greeting }}"));
    assert_eq!(render(&config, &host).unwrap(), "hi");
}

#[test]
fn test_render_to_dir_writes_each_template() {
    let dir = tempfile::tempdir().unwrap();
    let mut templates =
        Templates::new(Arc::new(FunctionRegistry::standard()), Default::default()).unwrap();
    templates.add_template("conf/app.ini", "port=80").unwrap();
    templates.add_template("README", "skip me").unwrap();

    let written = templates.render_to_dir("README", dir.path()).unwrap();
    assert_eq!(written, [dir.path().join("conf/app.ini")]);
    assert_eq!(
        fs::read_to_string(dir.path().join("conf/app.ini")).unwrap(),
        "port=80"
    );
    assert!(!dir.path().join("README").exists());
}

#[test]
#[serial]
fn test_real_environment_prefix() {
    std::env::set_var("STENCIL_TEST_REGION", "eu");
    std::env::set_var("STENCIL_TEST_ZONE", "b");

    let vars = Vars::from_sources(&[VarsSource::env("STENCIL_TEST_").under("env")], &Host::real())
        .unwrap();
    assert_eq!(
        vars.get("env").unwrap(),
        &json!({"STENCIL_TEST_REGION": "eu", "STENCIL_TEST_ZONE": "b"})
    );

    std::env::remove_var("STENCIL_TEST_REGION");
    std::env::remove_var("STENCIL_TEST_ZONE");
}

#[test]
#[serial]
fn test_real_environment_template() {
    std::env::set_var("STENCIL_TEST_TEMPLATE", "from env {{ n }}");

    let mut config = Config::default();
    config.vars_sources.push(VarsSource::literal("n", 7));
    config
        .template_sources
        .push(TemplateSource::env("t", "STENCIL_TEST_TEMPLATE"));
    assert_eq!(render(&config, &Host::real()).unwrap(), "from env 7");

    std::env::remove_var("STENCIL_TEST_TEMPLATE");
}
