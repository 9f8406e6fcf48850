//! Configuration access port trait.

pub trait ConfigPort {
    /// Raw value at `[section] key`. Typed parsing and its errors live in
    /// `config_validation`.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Names of every section, sorted.
    fn sections(&self) -> Vec<String>;

    /// Keys present in `section`, sorted; empty when the section is absent.
    fn keys(&self, section: &str) -> Vec<String>;
}
