//! The user-facing handle over a directory of config files.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::attr_map::is_identifier;
use super::builder::ConfigDirectoryBuilder;
use super::cache::{validate_name, ConfigCache, Layer, Resolver};
use super::{AttrMap, ConfigError, Format, RuntimeOverrides};

/// A directory of config files, resolved and cached by logical name.
///
/// `get("db")` reads `db.yaml`, rebases `db.local.yaml` onto it when that file
/// exists, then rebases any runtime overrides registered for `db`. The result
/// is cached; every later `get("db")` returns a handle to the same
/// [`AttrMap`], and reloads refill that mapping in place.
///
/// ## Runtime overrides
///
/// Overrides are changed through [`update_runtime`](Self::update_runtime) and
/// its helpers. Every change re-resolves all loaded configs immediately, so
/// handles captured earlier see the new values. Configs that were never
/// loaded pick the overrides up on first access.
///
/// ## Example
///
/// ```no_run
/// use confdir::ConfigDirectory;
///
/// let mut conf = ConfigDirectory::bind("conf")?;
/// let db = conf.get("db")?;
///
/// conf.update_runtime(|rt| rt.set("db", "port", 5433))?;
/// assert_eq!(db.get("port")?.as_i64(), Some(5433));
/// # Ok::<(), confdir::ConfigError>(())
/// ```
#[derive(Debug)]
pub struct ConfigDirectory {
    pub(super) dir: PathBuf,
    pub(super) format: Format,
    pub(super) resolver: Resolver,
    pub(super) cache: ConfigCache,
    pub(super) runtime: RuntimeOverrides,
}

impl ConfigDirectory {
    /// Binds the directory at `dir` with default settings.
    ///
    /// Fails with [`ConfigError::DirectoryNotFound`] if `dir` is not a directory.
    pub fn bind(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::builder(dir).build()
    }

    pub fn builder(dir: impl AsRef<Path>) -> ConfigDirectoryBuilder {
        ConfigDirectoryBuilder::new(dir)
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Returns the config called `name`, loading it on first access.
    pub fn get(&mut self, name: &str) -> Result<AttrMap, ConfigError> {
        self.cache.resolve(name, &self.resolver, &self.runtime)
    }

    /// Named access to a config. Same as [`get`](Self::get), but only for
    /// identifier names not starting with an underscore.
    pub fn attr(&mut self, name: &str) -> Result<AttrMap, ConfigError> {
        if !is_identifier(name) || name.starts_with('_') {
            return Err(ConfigError::InvalidAttribute(name.to_string()));
        }
        self.get(name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.cache.is_loaded(name)
    }

    /// Layers that produced the loaded config `name`.
    pub fn layers(&self, name: &str) -> Option<&[Layer]> {
        self.cache.layers(name)
    }

    /// Drops the cached contents of one config; the next access re-reads it.
    pub fn invalidate(&mut self, name: &str) -> bool {
        self.cache.invalidate(name)
    }

    /// Drops the cached contents of every config. Runtime overrides are kept.
    pub fn clear(&mut self) {
        self.cache.invalidate_all();
    }

    /// Re-reads one config into its existing mapping.
    pub fn reload(&mut self, name: &str) -> Result<AttrMap, ConfigError> {
        self.cache.reload(name, &self.resolver, &self.runtime)
    }

    /// Re-reads every loaded config into its existing mapping.
    pub fn reload_all(&mut self) -> Result<(), ConfigError> {
        self.cache.reload_loaded(&self.resolver, &self.runtime)
    }

    /// Read access to the runtime overrides. Lookups hand out copies.
    pub fn runtime(&self) -> &RuntimeOverrides {
        &self.runtime
    }

    /// Mutates the runtime overrides, then re-resolves every loaded config.
    ///
    /// This is the only way to change the overrides of a directory. Mapping
    /// handles taken from the store inside `f` stop affecting it once `f`
    /// returns. The closure's return value is passed through. If a reload
    /// fails, the change to the overrides is kept and the error is returned.
    pub fn update_runtime<F, R>(&mut self, f: F) -> Result<R, ConfigError>
    where
        F: FnOnce(&mut RuntimeOverrides) -> R,
    {
        let result = f(&mut self.runtime);
        self.runtime.detach();
        debug!(names = self.runtime.len(), "runtime overrides changed");
        self.reload_all()?;
        Ok(result)
    }

    /// Replaces the runtime overrides for `name` with a copy of `overrides`.
    pub fn set_runtime(&mut self, name: &str, overrides: &AttrMap) -> Result<(), ConfigError> {
        self.update_runtime(|rt| {
            rt.insert(name, overrides);
        })
    }

    /// Removes every runtime override.
    pub fn clear_runtime(&mut self) -> Result<(), ConfigError> {
        self.update_runtime(RuntimeOverrides::clear)
    }

    /// Replaces the contents of config `name` in memory, keeping its identity.
    ///
    /// The files are not touched; a reload brings back their contents.
    pub fn replace(&mut self, name: &str, contents: &AttrMap) -> Result<AttrMap, ConfigError> {
        let config = self.get(name)?;
        if !AttrMap::ptr_eq(&config, contents) {
            config.clear_contents();
            config.update(contents);
        }
        Ok(config)
    }

    /// Writes the resolved config `name` to `<dir>/<name>.<ext>`.
    ///
    /// The whole resolved config is written, local and runtime overrides
    /// included. Formatting and comments of the original file are lost.
    pub fn save(&mut self, name: &str) -> Result<PathBuf, ConfigError> {
        validate_name(name)?;
        let config = self.get(name)?;
        let path = self
            .dir
            .join(format!("{}.{}", name, self.format.extension()));
        let contents = config.dump_as(self.format)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::WriteError {
            path: path.clone(),
            source: e,
        })?;
        debug!(path = %path.display(), "saved config");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySource, Value};
    use std::fs;
    use tempfile::TempDir;

    const TEST_YAML: &str = r#"
test_key: test value
nested_test_root:
    nested_test_key_1: nested_test value_1
    nested_test_key_2: nested_test value_2
"#;

    const LOCAL_TEST_YAML: &str = r#"
test_key: test overridden value
nested_test_root:
    nested_test_key_1: overridden_nested_test value
"#;

    fn setup(files: &[(&str, &str)]) -> (TempDir, ConfigDirectory) {
        let dir = TempDir::new().unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        let conf = ConfigDirectory::bind(dir.path()).unwrap();
        (dir, conf)
    }

    #[test]
    fn test_bind_missing_directory() {
        let result = ConfigDirectory::bind("/nonexistent/config/dir");
        assert!(matches!(result, Err(ConfigError::DirectoryNotFound(_))));
    }

    #[test]
    fn test_basics() {
        let (_dir, mut conf) = setup(&[("test.yaml", TEST_YAML)]);

        let config = conf.get("test").unwrap();
        assert_eq!(config.get("test_key").unwrap(), Value::from("test value"));

        let by_item = config.get("nested_test_root").unwrap();
        let by_attr = config.attr("nested_test_root").unwrap();
        assert!(AttrMap::ptr_eq(
            by_item.as_mapping().unwrap(),
            by_attr.as_mapping().unwrap()
        ));
        assert!(AttrMap::ptr_eq(&config, &conf.attr("test").unwrap()));
    }

    #[test]
    fn test_attr_rejects_private_names() {
        let (_dir, mut conf) = setup(&[("_private.yaml", "a: 1\n")]);

        assert!(matches!(conf.attr("_private"), Err(ConfigError::InvalidAttribute(_))));
        assert!(conf.get("_private").is_ok());
    }

    #[test]
    fn test_local_override() {
        let (_dir, mut conf) = setup(&[("test.yaml", TEST_YAML), ("test.local.yaml", LOCAL_TEST_YAML)]);

        let config = conf.get("test").unwrap();
        assert_eq!(config.get("test_key").unwrap(), Value::from("test overridden value"));
        assert_eq!(
            config.lookup("nested_test_root/nested_test_key_1").unwrap(),
            Value::from("overridden_nested_test value")
        );
        assert_eq!(
            config.lookup("nested_test_root/nested_test_key_2").unwrap(),
            Value::from("nested_test value_2")
        );
    }

    #[test]
    fn test_reload_and_replace_keep_identity() {
        let (_dir, mut conf) = setup(&[("test.yaml", TEST_YAML)]);
        let old = conf.get("test").unwrap();

        let reloaded = conf.reload("test").unwrap();
        assert!(AttrMap::ptr_eq(&old, &reloaded));

        let replacement = AttrMap::from_iter([("foo", "bar")]);
        let replaced = conf.replace("test", &replacement).unwrap();
        assert!(AttrMap::ptr_eq(&old, &replaced));
        assert_eq!(old.keys(), ["foo"]);
    }

    #[test]
    fn test_not_found() {
        let (_dir, mut conf) = setup(&[]);

        assert!(matches!(conf.get("missing"), Err(ConfigError::NotFound(_))));
        assert!(!conf.is_loaded("missing"));
    }

    #[test]
    fn test_invalid_yaml() {
        let (_dir, mut conf) = setup(&[
            ("test.yaml", TEST_YAML),
            ("test.local.yaml", "% this isn't valid yaml\n"),
        ]);

        assert!(matches!(conf.get("test"), Err(ConfigError::ParseError { .. })));
        assert!(!conf.is_loaded("test"));
    }

    #[test]
    fn test_layered_resolution() {
        let (_dir, mut conf) = setup(&[("app.yaml", "a: 1\nb: 2\n"), ("app.local.yaml", "b: 3\n")]);

        let app = conf.get("app").unwrap();
        assert_eq!(app, AttrMap::from_iter([("a", 1), ("b", 3)]));

        conf.set_runtime("app", &AttrMap::from_iter([("b", 4)])).unwrap();
        assert_eq!(app, AttrMap::from_iter([("a", 1), ("b", 4)]));

        assert!(conf.invalidate("app"));
        let again = conf.get("app").unwrap();
        assert_eq!(again, AttrMap::from_iter([("a", 1), ("b", 4)]));
        assert_eq!(
            conf.layers("app").unwrap(),
            [
                Layer::Base { origin: conf.path().display().to_string() },
                Layer::Local { origin: conf.path().display().to_string() },
                Layer::Runtime,
            ]
        );
    }

    #[test]
    fn test_runtime_override_persists_across_clear() {
        let (_dir, mut conf) = setup(&[("test_config.yaml", "existing: 1\n")]);

        conf.update_runtime(|rt| {
            rt.entry("test_config").insert("random", true);
            rt.set("foo", "bar", "baz");
        })
        .unwrap();
        assert!(conf.attr("test_config").unwrap().contains_key("random"));

        conf.clear();
        let config = conf.attr("test_config").unwrap();
        assert_eq!(config.get("random").unwrap(), Value::Bool(true));
        assert_eq!(config.attr("random").unwrap(), Value::Bool(true));

        conf.update_runtime(|rt| rt.entry("test_config").remove("random"))
            .unwrap();
        assert!(!config.contains_key("random"));
    }

    #[test]
    fn test_runtime_change_reaches_captured_config() {
        let (_dir, mut conf) = setup(&[("test.yaml", TEST_YAML)]);
        let captured = conf.attr("test").unwrap();

        conf.update_runtime(|rt| rt.set("test", "test_key", "changed")).unwrap();

        assert_eq!(captured.get("test_key").unwrap(), Value::from("changed"));
        assert!(AttrMap::ptr_eq(&captured, &conf.attr("test").unwrap()));
    }

    #[test]
    fn test_held_handles_cannot_desync_runtime_store() {
        let (_dir, mut conf) = setup(&[("app.yaml", "a: 1\n")]);
        let app = conf.get("app").unwrap();
        let overrides = AttrMap::from_iter([("a", 2)]);
        conf.set_runtime("app", &overrides).unwrap();
        assert_eq!(app.get("a").unwrap(), Value::Integer(2));

        overrides.insert("a", 3);
        conf.runtime().get("app").unwrap().insert("b", 9);
        let mut escaped = None;
        conf.update_runtime(|rt| escaped = Some(rt.entry("app").clone()))
            .unwrap();
        escaped.unwrap().insert("c", 7);

        assert_eq!(conf.runtime().get("app").unwrap(), AttrMap::from_iter([("a", 2)]));
        conf.invalidate("app");
        assert_eq!(conf.get("app").unwrap(), AttrMap::from_iter([("a", 2)]));
    }

    #[test]
    fn test_clearing_a_served_config_invalidates_it() {
        let (_dir, mut conf) = setup(&[("app.yaml", "a: 1\n"), ("app.local.yaml", "b: 2\n")]);
        conf.update_runtime(|rt| rt.set("app", "c", 3)).unwrap();

        conf.get("app").unwrap().clear();
        assert!(!conf.is_loaded("app"));

        let again = conf.get("app").unwrap();
        assert_eq!(again, AttrMap::from_iter([("a", 1), ("b", 2), ("c", 3)]));
        assert!(conf.is_loaded("app"));
    }

    #[test]
    fn test_replace_is_not_an_invalidation() {
        let (_dir, mut conf) = setup(&[("app.yaml", "a: 1\n")]);

        conf.replace("app", &AttrMap::from_iter([("z", 26)])).unwrap();

        assert!(conf.is_loaded("app"));
        assert_eq!(conf.get("app").unwrap(), AttrMap::from_iter([("z", 26)]));
    }

    #[test]
    fn test_runtime_clear_restores_files() {
        let (_dir, mut conf) = setup(&[("test.yaml", TEST_YAML)]);
        conf.update_runtime(|rt| rt.set("test", "test_key", "changed")).unwrap();
        assert_eq!(conf.get("test").unwrap().get("test_key").unwrap(), Value::from("changed"));

        conf.clear_runtime().unwrap();

        assert!(conf.runtime().is_empty());
        assert_eq!(conf.get("test").unwrap().get("test_key").unwrap(), Value::from("test value"));
    }

    #[test]
    fn test_runtime_only_config_is_not_found() {
        let (_dir, mut conf) = setup(&[]);
        conf.update_runtime(|rt| rt.set("foo", "test_key", "value")).unwrap();

        assert!(matches!(conf.get("foo"), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_unloaded_configs_pick_up_runtime_lazily() {
        let (_dir, mut conf) = setup(&[("a.yaml", "v: 1\n"), ("b.yaml", "v: 1\n")]);
        let a = conf.get("a").unwrap();

        conf.update_runtime(|rt| {
            rt.set("a", "v", 2);
            rt.set("b", "v", 2);
        })
        .unwrap();

        assert!(!conf.is_loaded("b"));
        assert_eq!(a.get("v").unwrap(), Value::Integer(2));
        assert_eq!(conf.get("b").unwrap().get("v").unwrap(), Value::Integer(2));
    }

    #[test]
    fn test_save_persists_edits() {
        let (dir, mut conf) = setup(&[("test.yaml", TEST_YAML)]);

        let config = conf.get("test").unwrap();
        config.insert("added", vec![1, 2]);
        let path = conf.save("test").unwrap();
        assert_eq!(path, dir.path().join("test.yaml"));

        conf.invalidate("test");
        let reread = conf.get("test").unwrap();
        assert_eq!(reread.get("added").unwrap(), Value::from(vec![1, 2]));
        assert_eq!(reread.get("test_key").unwrap(), Value::from("test value"));
    }

    #[test]
    fn test_toml_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.toml"), "[server]\nport = 80\nhost = \"a\"\n").unwrap();
        fs::write(dir.path().join("app.dev.toml"), "[server]\nport = 8080\n").unwrap();
        let mut conf = ConfigDirectory::builder(dir.path())
            .with_format(Format::Toml)
            .with_local_suffix("dev")
            .build()
            .unwrap();

        let app = conf.get("app").unwrap();
        assert_eq!(app.lookup("server/port").unwrap(), Value::Integer(8080));
        assert_eq!(app.lookup("server/host").unwrap(), Value::from("a"));

        conf.save("app").unwrap();
        let text = fs::read_to_string(dir.path().join("app.toml")).unwrap();
        assert!(text.contains("port = 8080"));
    }

    #[test]
    fn test_inheritance_through_directory() {
        let inherit_yaml = format!(
            "{TEST_YAML}{}",
            r#"
inherit_value:
    inherit: nested_test_root
    inherit_nested_value:
        inherit: inherit_value
string_inherit:
    inherit: test_key
"#
        );
        let (_dir, mut conf) = setup(&[("test.yaml", inherit_yaml.as_str())]);

        let config = conf.get("test").unwrap();
        assert_eq!(config.attr("string_inherit").unwrap(), Value::from("test value"));
        assert_eq!(
            config.get("nested_test_root").unwrap(),
            config.lookup("inherit_value/inherit_nested_value").unwrap()
        );
    }

    #[test]
    fn test_broken_inherit_is_fatal() {
        let (_dir, mut conf) = setup(&[("test.yaml", "broken_inherit:\n  inherit: does/not/exist\n")]);

        assert!(matches!(
            conf.get("test"),
            Err(ConfigError::InheritPathNotFound { .. })
        ));
    }

    #[test]
    fn test_extra_source_precedes_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.local.yaml"), "port: 9000\n").unwrap();
        let defaults = AttrMap::from_iter([("port", Value::from(80)), ("host", Value::from("localhost"))]);
        let mut conf = ConfigDirectory::builder(dir.path())
            .with_source(MemorySource::new("defaults").with_document("app", defaults))
            .build()
            .unwrap();

        let app = conf.get("app").unwrap();
        assert_eq!(app.get("port").unwrap(), Value::Integer(9000));
        assert_eq!(app.get("host").unwrap(), Value::from("localhost"));
    }
}
