use std::collections::{HashMap, HashSet};

/// Canonical syntactic kind names used by the default configuration.
///
/// Adapters over a concrete parser translate its type names into these, or
/// supply their own tables through [`LanguageConfig`].
pub mod kinds {
    pub const COMPILATION_UNIT: &str = "compilation_unit";
    pub const TYPE_DECLARATION: &str = "type_declaration";
    pub const METHOD_DECLARATION: &str = "method_declaration";
    pub const FIELD_DECLARATION: &str = "field_declaration";
    pub const RECORD_COMPONENT: &str = "record_component";
    pub const VARIABLE_DECLARATION_STATEMENT: &str = "variable_declaration_statement";
    pub const VARIABLE_DECLARATION_FRAGMENT: &str = "variable_declaration_fragment";
    pub const RETURN_STATEMENT: &str = "return_statement";
    pub const IMPORT_DECLARATION: &str = "import_declaration";
    pub const EMPTY_STATEMENT: &str = "empty_statement";
    pub const CLASS_INSTANCE_CREATION: &str = "class_instance_creation";
    pub const SIMPLE_TYPE: &str = "simple_type";
    pub const SIMPLE_NAME: &str = "simple_name";
    pub const LINE_COMMENT: &str = "line_comment";
}

/// Syntactic-kind rules for one analysis run.
///
/// Constructor-supplied rather than process-wide: concurrent analyses of
/// different commits never share mutable configuration.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Ancestor kinds attached as context nodes during the upward walk;
    /// everything else is skipped over.
    pub context_ancestors: HashSet<String>,
    /// Kinds carrying no explanatory value; their nodes are deactivated.
    pub inactive_kinds: HashSet<String>,
    /// Kinds never chained into successive patterns.
    pub succession_excluded: HashSet<String>,
    /// Kinds eligible for the singleton fallback pattern.
    pub singular_kinds: HashSet<String>,
    /// Display labels for context kinds, e.g. `method_declaration` -> `METHOD`.
    pub kind_labels: HashMap<String, String>,

    pub compilation_unit: String,
    pub type_declaration: String,
    pub method_declaration: String,
    pub field_declaration: String,
    pub parameter_declaration: String,
    pub variable_statement: String,
    pub variable_fragment: String,
    pub instantiation: String,
    pub simple_type: String,
    pub name: String,

    /// Maximum edit distance for a similarity edge; the default of zero
    /// links structurally equal spans only.
    pub similarity_threshold: f32,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect();

        Self {
            context_ancestors: owned(&[
                kinds::COMPILATION_UNIT,
                kinds::TYPE_DECLARATION,
                kinds::METHOD_DECLARATION,
                kinds::VARIABLE_DECLARATION_STATEMENT,
                kinds::RETURN_STATEMENT,
            ]),
            inactive_kinds: owned(&[kinds::IMPORT_DECLARATION, kinds::EMPTY_STATEMENT]),
            succession_excluded: owned(&[kinds::TYPE_DECLARATION, kinds::METHOD_DECLARATION]),
            singular_kinds: owned(&[kinds::METHOD_DECLARATION]),
            kind_labels: [
                (kinds::VARIABLE_DECLARATION_STATEMENT, "VARIABLE"),
                (kinds::METHOD_DECLARATION, "METHOD"),
                (kinds::TYPE_DECLARATION, "TYPE"),
                (kinds::COMPILATION_UNIT, "FILE"),
            ]
            .into_iter()
            .map(|(kind, label)| (kind.to_string(), label.to_string()))
            .collect(),
            compilation_unit: kinds::COMPILATION_UNIT.to_string(),
            type_declaration: kinds::TYPE_DECLARATION.to_string(),
            method_declaration: kinds::METHOD_DECLARATION.to_string(),
            field_declaration: kinds::FIELD_DECLARATION.to_string(),
            parameter_declaration: kinds::RECORD_COMPONENT.to_string(),
            variable_statement: kinds::VARIABLE_DECLARATION_STATEMENT.to_string(),
            variable_fragment: kinds::VARIABLE_DECLARATION_FRAGMENT.to_string(),
            instantiation: kinds::CLASS_INSTANCE_CREATION.to_string(),
            simple_type: kinds::SIMPLE_TYPE.to_string(),
            name: kinds::SIMPLE_NAME.to_string(),
            similarity_threshold: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_cover_the_context_whitelist() {
        let config = LanguageConfig::default();
        for kind in [
            kinds::COMPILATION_UNIT,
            kinds::TYPE_DECLARATION,
            kinds::METHOD_DECLARATION,
            kinds::VARIABLE_DECLARATION_STATEMENT,
            kinds::RETURN_STATEMENT,
        ] {
            assert!(config.context_ancestors.contains(kind));
        }
        assert!(!config.context_ancestors.contains(kinds::IMPORT_DECLARATION));
        assert_eq!(config.similarity_threshold, 0.0);
    }
}
