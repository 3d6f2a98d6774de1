use confdir::{ConfigDirectory, Value};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct AppSection {
    name: String,
    debug: bool,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct DatabaseSection {
    host: String,
    port: u16,
    name: String,
}

fn main() -> Result<(), confdir::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut conf = ConfigDirectory::bind("demos/conf")?;

    // app.yaml with app.local.yaml rebased on top
    let app = conf.attr("app")?;
    let section: AppSection = app.get("app")?.as_mapping().cloned().unwrap_or_default().extract()?;
    println!("App: {} (debug={})", section.name, section.debug);

    // `replica` inherits everything from `database` except its own host
    let replica: DatabaseSection = app.lookup("replica")?.as_mapping().cloned().unwrap_or_default().extract()?;
    println!("Replica: {}:{}", replica.host, replica.port);

    // Runtime overrides apply to the already-captured `app` handle
    conf.update_runtime(|rt| {
        rt.entry("app").insert("database", confdir::AttrMap::from_iter([("port", 6543)]));
    })?;
    println!("Database port after override: {:?}", app.lookup("database/port")?);
    assert_eq!(app.lookup("database/host")?, Value::from("localhost"));

    for layer in conf.layers("app").unwrap_or_default() {
        println!("layer: {layer:?}");
    }

    Ok(())
}
