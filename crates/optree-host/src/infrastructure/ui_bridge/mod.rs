//! Command bridge: exposes the option host to a user interface.
//!
//! Every command takes the shared [`HostState`] and returns a
//! [`CommandResult`], so a frontend always receives the same
//! `{ success, data, error }` shape whatever happened.
//!
//! # Data Transfer Objects (for beginners)
//!
//! The engine's types (`NodeId`, `OptionValue`, `Uuid`) are not meant for a
//! UI.  DTOs such as [`OptionDto`] carry plain strings and booleans, derive
//! `Serialize`/`Deserialize`, and are built from the engine's types right at
//! the bridge.
//!
//! # Threading
//!
//! The option tree is single-threaded (change hooks are `Rc` closures), so
//! [`HostState`] is owned by one thread and commands borrow it mutably.

pub mod browser;

use std::cell::RefCell;
use std::rc::Rc;

use optree_core::value::format::format_value;
use optree_core::value::parse::parse_value;
use optree_core::{
    unregister_all, CommentPolicy, LookupMode, NodeId, OptionFlags, OptionNode, OptionStore, OptionTree, OptionValue,
    Registration,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use self::browser::{BrowserEntry, OptionBrowser};
use crate::application::builtin::{register_autocreated_defaults, register_builtin_options};
use crate::application::error::HostError;
use crate::application::hooks::{install_change_hooks, HostEffects, HostServices};
use crate::application::overrides::{apply_overrides, set_from_text};
use crate::application::report::render_report;
use crate::application::sessions::{Session, SessionId, SessionRegistry};
use crate::infrastructure::storage::config::HostConfig;

// ── Shared host state ─────────────────────────────────────────────────────────

/// Everything a running host owns.
pub struct HostState {
    pub store: OptionStore,
    pub sessions: SessionRegistry,
    /// Service requests recorded by the change hooks.
    pub effects: Rc<HostEffects>,
    /// The listbox view fed by the canonical tree's observer.
    pub browser: Rc<RefCell<OptionBrowser>>,
    pub config: HostConfig,
    registration: Registration,
}

impl HostState {
    /// Builds the canonical tree, registers the builtin options, presets and
    /// change hooks, then applies the settings overrides.
    ///
    /// Overrides that fail are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when the builtin table or the hook table does
    /// not install cleanly.
    pub fn new(config: HostConfig) -> Result<Self, HostError> {
        let mut tree = OptionTree::with_root(OptionNode::tree("config").with_flags(OptionFlags::LISTBOX));
        let browser = Rc::new(RefCell::new(OptionBrowser::new()));
        tree.attach_observer(Box::new(Rc::clone(&browser)));
        tree.set_show_templates(config.host.show_templates);

        let mut store = OptionStore::new(tree);
        let registration = register_builtin_options(&mut store)?;
        register_autocreated_defaults(&mut store)?;

        let effects = Rc::new(HostEffects::new());
        let root = store.config_root();
        install_change_hooks(store.tree_mut(), root, Rc::clone(&effects) as Rc<dyn HostServices>)?;
        store.set_value("config.show_template", OptionValue::Bool(config.host.show_templates), None)?;
        store.tree_mut().untouch(root);

        apply_overrides(&mut store, &config.overrides);
        info!(options = store.tree().len(), "option host ready");

        Ok(Self { store, sessions: SessionRegistry::new(), effects, browser, config, registration })
    }

    pub fn comment_policy(&self) -> CommentPolicy {
        self.config.host.save_comments.into()
    }

    /// Renders the options a save would write.  With `force_all` every
    /// option is selected, changed or not.  Touched flags are cleared
    /// afterwards, as after a successful save.
    pub fn settings_report(&mut self, force_all: bool) -> String {
        let root = self.store.config_root();
        let policy = self.comment_policy();
        let indent = match self.store.get_value("config.indentation", None) {
            Ok(OptionValue::Int(n)) => usize::try_from(n).unwrap_or(0),
            _ => 2,
        };
        let tree = self.store.tree_mut();
        tree.prepare_must_save(root, force_all);
        let report = render_report(tree, root, policy, indent);
        tree.untouch(root);
        report
    }

    /// Closes every session and unregisters the builtin options.  Returns
    /// the number of canonical nodes freed.
    pub fn shutdown(&mut self) -> usize {
        let overlays = self.sessions.close_all(&mut self.store);
        let freed = unregister_all(self.store.tree_mut(), &self.registration);
        self.registration = Registration::default();
        info!(overlays, freed, "option host shut down");
        freed
    }
}

// ── Data Transfer Objects ─────────────────────────────────────────────────────

/// One option as shown to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDto {
    pub path: String,
    pub name: String,
    /// Kind name as shown by option managers (`"Integer"`, `"Folder"`, ...).
    pub kind: String,
    /// Formatted value; `None` for folders, commands and aliases.
    pub value: Option<String>,
    pub caption: Option<String>,
    pub description: Option<String>,
    pub is_folder: bool,
    pub touched: bool,
    pub deleted: bool,
}

impl OptionDto {
    fn new(path: String, node: &OptionNode) -> Self {
        let flags = node.flags();
        Self {
            path,
            name: node.name().to_string(),
            kind: node.kind().name().to_string(),
            value: format_value(node.value(), node.bounds().1),
            caption: node.caption().map(str::to_string),
            description: node.description().map(str::to_string),
            is_folder: node.is_tree(),
            touched: flags.contains(OptionFlags::TOUCHED),
            deleted: flags.contains(OptionFlags::DELETED),
        }
    }
}

/// One open session as shown to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDto {
    pub session_id: String,
    pub title: String,
}

impl From<&Session> for SessionDto {
    fn from(s: &Session) -> Self {
        Self { session_id: s.id.to_string(), title: s.title.clone() }
    }
}

/// One listbox item as shown to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserEntryDto {
    pub name: String,
    pub is_folder: bool,
}

impl From<&BrowserEntry> for BrowserEntryDto {
    fn from(e: &BrowserEntry) -> Self {
        Self { name: e.name.clone(), is_folder: e.is_folder }
    }
}

/// Unified response wrapper used by every command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

impl<T: Serialize, E: std::fmt::Display> From<Result<T, E>> for CommandResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

fn parse_session(id: &str) -> Result<SessionId, HostError> {
    Uuid::parse_str(id).map_err(|_| HostError::MalformedSessionId(id.to_string()))
}

fn session_context(state: &HostState, session: Option<&str>) -> Result<Option<SessionId>, HostError> {
    let Some(session) = session else { return Ok(None) };
    let id = parse_session(session)?;
    state.sessions.get(id).ok_or(HostError::UnknownSession(id))?;
    Ok(Some(id))
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Returns one option, as seen from `session` when given.
///
/// Reads follow aliases; the DTO describes the option named by `path`
/// with the value the session sees.
pub fn get_option(state: &mut HostState, path: &str, session: Option<&str>) -> CommandResult<OptionDto> {
    let result = (|| -> Result<OptionDto, HostError> {
        let context = session_context(state, session)?;
        let value = state.store.get_value(path, context)?;
        let id = state.store.resolve(path, LookupMode::Normal)?;
        let node = state.store.tree().node(id)?;
        let mut dto = OptionDto::new(path.to_string(), node);
        if !node.is_tree() {
            dto.value = format_value(&value, node.bounds().1);
        }
        Ok(dto)
    })();
    result.into()
}

/// Parses `text` and writes it to the option at `path`.  Returns the number
/// of change hooks that ran.
pub fn set_option(state: &mut HostState, path: &str, text: &str, session: Option<&str>) -> CommandResult<usize> {
    let result =
        session_context(state, session).and_then(|context| set_from_text(&mut state.store, path, text, context));
    result.into()
}

/// Flips a Bool option or advances an Int option in the canonical tree.
pub fn toggle_option(state: &mut HostState, path: &str) -> CommandResult<usize> {
    let result = (|| -> Result<usize, HostError> {
        let id = state.store.resolve(path, LookupMode::Strict)?;
        Ok(state.store.tree_mut().toggle(id, None)?)
    })();
    result.into()
}

/// Writes several options below `root_path` at once.  Nothing is written
/// unless every value parses and validates.  Returns the number of options
/// that changed.
pub fn commit_options(state: &mut HostState, root_path: &str, values: &[(&str, &str)]) -> CommandResult<usize> {
    let result = (|| -> Result<usize, HostError> {
        let root = resolve_root(&mut state.store, root_path)?;
        let tree = state.store.tree_mut();
        let mut parsed = Vec::with_capacity(values.len());
        for (path, text) in values {
            let node = tree.node(tree.prototype(root, path)?)?;
            let (min, max) = node.bounds();
            let value = parse_value(node.kind(), text, min, max)
                .map_err(|source| HostError::InvalidValue { path: (*path).to_string(), source })?;
            parsed.push((*path, value));
        }
        Ok(tree.commit_values(root, &parsed, None)?)
    })();
    result.into()
}

/// Lists the children of the tree at `path` (the config root when empty).
pub fn list_children(state: &mut HostState, path: &str) -> CommandResult<Vec<OptionDto>> {
    let result = (|| -> Result<Vec<OptionDto>, HostError> {
        let parent = resolve_root(&mut state.store, path)?;
        let tree = state.store.tree();
        tree.children(parent)
            .iter()
            .map(|child| -> Result<OptionDto, HostError> {
                let node = tree.node(*child)?;
                let child_path = match path {
                    "" => node.name().to_string(),
                    _ => format!("{path}.{}", node.name()),
                };
                Ok(OptionDto::new(child_path, node))
            })
            .collect()
    })();
    result.into()
}

/// Soft-deletes the option at `path`.  The next save writes it as unset.
pub fn delete_option(state: &mut HostState, path: &str) -> CommandResult<()> {
    let result = (|| -> Result<(), HostError> {
        let id = state.store.resolve(path, LookupMode::Strict)?;
        Ok(state.store.tree_mut().mark_deleted(id)?)
    })();
    result.into()
}

/// Returns the visible listbox entries below the tree at `path`.
pub fn browse(state: &mut HostState, path: &str) -> CommandResult<Vec<BrowserEntryDto>> {
    let result = resolve_root(&mut state.store, path).map(|parent| {
        let browser = state.browser.borrow();
        let entries: Vec<BrowserEntryDto> =
            browser.entries(parent).iter().filter(|entry| entry.visible).map(BrowserEntryDto::from).collect();
        entries
    });
    result.into()
}

/// Opens a session and returns it.
pub fn open_session(state: &mut HostState, title: &str) -> CommandResult<SessionDto> {
    let id = state.sessions.open(&mut state.store, title);
    match state.sessions.get(id) {
        Some(session) => CommandResult::ok(SessionDto::from(session)),
        None => CommandResult::err(HostError::UnknownSession(id).to_string()),
    }
}

/// Closes a session.  Returns the number of overlay options freed.
pub fn close_session(state: &mut HostState, session_id: &str) -> CommandResult<usize> {
    let result = parse_session(session_id).and_then(|id| state.sessions.close(&mut state.store, id));
    result.into()
}

/// Returns all open sessions, sorted by title.
pub fn get_sessions(state: &HostState) -> CommandResult<Vec<SessionDto>> {
    CommandResult::ok(state.sessions.all().iter().map(SessionDto::from).collect())
}

fn resolve_root(store: &mut OptionStore, path: &str) -> Result<NodeId, HostError> {
    if path.is_empty() {
        return Ok(store.config_root());
    }
    Ok(store.resolve(path, LookupMode::Normal)?)
}
