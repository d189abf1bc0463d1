//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// All `key = value` pairs of a section, sorted by key. A key without a
    /// value maps to an empty string. Empty if the section is absent.
    fn get_section(&self, section: &str) -> Vec<(String, String)>;
}
