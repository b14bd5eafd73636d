//! The host's change-hook table.
//!
//! Hooks translate option changes into work for the rest of the host:
//! re-rendering documents, redrawing terminals, switching the interface
//! language.  They talk to the host only through the [`HostServices`] trait,
//! so tests can check which services a change reaches without a running UI.
//!
//! Every hook returns [`HookOutcome::Continue`]: a change to
//! `ui.language` reaches both the language hook and the `ui` hook.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use optree_core::{
    register_change_hooks, ChangeHook, ContextId, HookCall, HookOutcome, NodeId, OptionFlags, OptionTree,
    OptionValue, TreeError,
};
use tracing::{debug, warn};

/// Services the hooks drive.
///
/// Infrastructure implements this against the real UI; [`HostEffects`]
/// records the requests for the headless binary and for tests.
#[cfg_attr(test, mockall::automock)]
pub trait HostServices {
    /// Switches the interface language to the [`LANGUAGES`] entry at `index`.
    ///
    /// [`LANGUAGES`]: optree_core::value::charset::LANGUAGES
    fn set_language(&self, index: usize);
    /// Re-renders the documents of one context, or of all when `None`.
    fn rerender_documents(&self, context: Option<ContextId>);
    fn redraw_terminals(&self);
    fn check_connection_queue(&self);
    fn refresh_status(&self);
}

/// Records service requests instead of performing them.
#[derive(Debug, Default)]
pub struct HostEffects {
    language: Cell<Option<usize>>,
    rerenders: RefCell<Vec<Option<ContextId>>>,
    redraws: Cell<usize>,
    connection_checks: Cell<usize>,
    status_refreshes: Cell<usize>,
}

impl HostEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(&self) -> Option<usize> {
        self.language.get()
    }

    /// Drains the pending re-render requests.
    pub fn take_rerenders(&self) -> Vec<Option<ContextId>> {
        self.rerenders.take()
    }

    pub fn redraws(&self) -> usize {
        self.redraws.get()
    }

    pub fn connection_checks(&self) -> usize {
        self.connection_checks.get()
    }

    pub fn status_refreshes(&self) -> usize {
        self.status_refreshes.get()
    }
}

impl HostServices for HostEffects {
    fn set_language(&self, index: usize) {
        self.language.set(Some(index));
    }

    fn rerender_documents(&self, context: Option<ContextId>) {
        self.rerenders.borrow_mut().push(context);
    }

    fn redraw_terminals(&self) {
        self.redraws.set(self.redraws.get() + 1);
    }

    fn check_connection_queue(&self) {
        self.connection_checks.set(self.connection_checks.get() + 1);
    }

    fn refresh_status(&self) {
        self.status_refreshes.set(self.status_refreshes.get() + 1);
    }
}

// ── Template visibility ───────────────────────────────────────────────────────

/// Shows or hides every `_template_` entry below `root` in the option
/// browser, together with everything inside those templates.
///
/// Soft-deleted nodes are skipped and keep their entries hidden.
///
/// # Errors
///
/// Returns [`TreeError::StaleNode`] when `root` is not live.
pub fn update_visibility(tree: &mut OptionTree, root: NodeId, show: bool) -> Result<(), TreeError> {
    tree.node(root)?;
    for child in tree.children(root).to_vec() {
        apply_visibility(tree, child, show, false)?;
    }
    Ok(())
}

fn apply_visibility(tree: &mut OptionTree, id: NodeId, show: bool, in_template: bool) -> Result<(), TreeError> {
    let node = tree.node(id)?;
    if node.flags().contains(OptionFlags::DELETED) {
        return Ok(());
    }
    let is_template = node.is_template();
    let is_tree = node.is_tree();

    if is_template || in_template {
        tree.set_mirror_visible(id, show)?;
    }
    if is_tree {
        for child in tree.children(id).to_vec() {
            apply_visibility(tree, child, show, in_template || is_template)?;
        }
    }
    Ok(())
}

// ── Hook table ────────────────────────────────────────────────────────────────

/// Builds the `(path, hook)` table.  Paths are relative to the config root.
pub fn change_hooks(services: Rc<dyn HostServices>) -> Vec<(&'static str, ChangeHook)> {
    let rerender = |services: &Rc<dyn HostServices>| -> ChangeHook {
        let services = Rc::clone(services);
        Rc::new(move |_: &mut OptionTree, call: &HookCall| {
            services.rerender_documents(call.context);
            HookOutcome::Continue
        })
    };

    let show_template: ChangeHook = Rc::new(|tree: &mut OptionTree, call: &HookCall| {
        let show = tree.node(call.current).ok().and_then(|node| node.value().as_bool()).unwrap_or(false);
        tree.set_show_templates(show);
        let root = tree.root();
        if let Err(err) = update_visibility(tree, root, show) {
            warn!(error = %err, "failed to update template visibility");
        }
        debug!(show, "template visibility changed");
        HookOutcome::Continue
    });

    let connection: ChangeHook = {
        let services = Rc::clone(&services);
        Rc::new(move |_: &mut OptionTree, _: &HookCall| {
            services.check_connection_queue();
            HookOutcome::Continue
        })
    };

    let terminal: ChangeHook = {
        let services = Rc::clone(&services);
        Rc::new(move |_: &mut OptionTree, _: &HookCall| {
            services.redraw_terminals();
            HookOutcome::Continue
        })
    };

    let language: ChangeHook = {
        let services = Rc::clone(&services);
        Rc::new(move |tree: &mut OptionTree, call: &HookCall| {
            match tree.node(call.current).map(|node| node.value()) {
                Ok(OptionValue::Language(index)) => services.set_language(*index),
                _ => warn!(node = %call.current, "language hook on a non-language option"),
            }
            HookOutcome::Continue
        })
    };

    let ui: ChangeHook = {
        let services = Rc::clone(&services);
        Rc::new(move |_: &mut OptionTree, _: &HookCall| {
            services.refresh_status();
            HookOutcome::Continue
        })
    };

    vec![
        ("config.show_template", show_template),
        ("connection", connection),
        ("document.browse", rerender(&services)),
        ("document.cache", rerender(&services)),
        ("document.codepage", rerender(&services)),
        ("document.colors", rerender(&services)),
        ("document.html", rerender(&services)),
        ("document.plain", rerender(&services)),
        ("terminal", terminal),
        ("ui.language", language),
        ("ui", ui),
    ]
}

/// Installs [`change_hooks`] below `root`.
///
/// # Errors
///
/// Returns the first hook path that does not resolve.
pub fn install_change_hooks(
    tree: &mut OptionTree,
    root: NodeId,
    services: Rc<dyn HostServices>,
) -> Result<(), TreeError> {
    let hooks = change_hooks(services);
    register_change_hooks(tree, root, &hooks)?;
    debug!(hooks = hooks.len(), "installed change hooks");
    Ok(())
}

#[cfg(test)]
mod tests {
    use optree_core::{Color, LookupMode, OptionNode, OptionStore, TEMPLATE_NAME};

    use super::*;
    use crate::application::builtin::register_builtin_options;

    fn store_with(services: Rc<dyn HostServices>) -> OptionStore {
        let mut store = OptionStore::new(OptionTree::with_root(
            OptionNode::tree("config").with_flags(OptionFlags::LISTBOX),
        ));
        register_builtin_options(&mut store).unwrap();
        let root = store.config_root();
        install_change_hooks(store.tree_mut(), root, services).unwrap();
        store
    }

    #[test]
    fn test_document_change_requests_rerender_for_its_context() {
        // Arrange
        let effects = Rc::new(HostEffects::new());
        let mut store = store_with(Rc::clone(&effects) as Rc<dyn HostServices>);
        let context = store.open_context();

        // Act
        store.set_value("document.colors.link", OptionValue::Color(Color::decode("red").unwrap()), None).unwrap();
        store.set_value("document.html.display_tables", OptionValue::Bool(false), Some(context)).unwrap();

        // Assert
        assert_eq!(effects.take_rerenders(), vec![None, Some(context)]);
        assert!(effects.take_rerenders().is_empty());
    }

    #[test]
    fn test_language_change_reaches_language_and_ui_hooks() {
        // Arrange
        let mut services = MockHostServices::new();
        services.expect_set_language().withf(|index| *index == 6).times(1).return_const(());
        services.expect_refresh_status().times(1).return_const(());
        let mut store = store_with(Rc::new(services));

        // Act
        let invoked = store.set_value("ui.language", OptionValue::Language(6), None).unwrap();

        // Assert
        assert_eq!(invoked, 2);
    }

    #[test]
    fn test_terminal_change_redraws_once() {
        let mut services = MockHostServices::new();
        services.expect_redraw_terminals().times(1).return_const(());
        let mut store = store_with(Rc::new(services));

        store.set_value("terminal.xterm.colors", OptionValue::Int(2), None).unwrap();
    }

    #[test]
    fn test_connection_change_checks_queue() {
        let effects = Rc::new(HostEffects::new());
        let mut store = store_with(Rc::clone(&effects) as Rc<dyn HostServices>);

        store.set_value("connection.retries", OptionValue::Int(5), None).unwrap();

        assert_eq!(effects.connection_checks(), 1);
        assert_eq!(effects.redraws(), 0);
    }

    #[test]
    fn test_show_template_toggles_template_entries() {
        // Arrange
        let effects = Rc::new(HostEffects::new());
        let mut store = store_with(Rc::clone(&effects) as Rc<dyn HostServices>);
        let template = store.resolve(&format!("terminal.{TEMPLATE_NAME}"), LookupMode::Strict).unwrap();
        let inner = store.resolve(&format!("terminal.{TEMPLATE_NAME}.colors"), LookupMode::Strict).unwrap();
        let visible = |store: &OptionStore, id| store.tree().node(id).unwrap().mirror().map(|m| m.visible);
        assert_eq!(visible(&store, template), Some(false));

        // Act
        store.set_value("config.show_template", OptionValue::Bool(true), None).unwrap();

        // Assert
        assert_eq!(visible(&store, template), Some(true));
        assert_eq!(visible(&store, inner), Some(true));
        assert!(store.tree().show_templates());

        store.set_value("config.show_template", OptionValue::Bool(false), None).unwrap();
        assert_eq!(visible(&store, template), Some(false));
        assert_eq!(visible(&store, inner), Some(false));
    }

    #[test]
    fn test_update_visibility_skips_deleted_templates() {
        let mut tree = OptionTree::with_root(OptionNode::tree("config").with_flags(OptionFlags::LISTBOX));
        let root = tree.root();
        let parent = tree.insert(root, OptionNode::tree("p").mirrored()).unwrap();
        let template = tree.insert(parent, OptionNode::tree(TEMPLATE_NAME).mirrored()).unwrap();
        tree.mark_deleted(template).unwrap();

        update_visibility(&mut tree, root, true).unwrap();

        assert_eq!(tree.node(template).unwrap().mirror().map(|m| m.visible), Some(false));
        assert_eq!(tree.node(parent).unwrap().mirror().map(|m| m.visible), Some(true));
    }
}
