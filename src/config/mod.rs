pub mod applicator;
pub mod loader;
pub mod schema;
pub mod settings;

pub use applicator::{run_script, ScriptRun, StepResult};
pub use loader::{
    load_script_from_path, load_script_from_str, load_settings_from_path, load_settings_from_str,
    ConfigError, InvalidConfig,
};
pub use schema::{
    EditDefinition, EditOperation, EditScript, Metadata, ValidationError, ValidationIssue,
};
pub use settings::{
    ChangelogSettings, EditorSettings, Landmarks, RepairSettings, SettingsError, SettingsIssue,
};
