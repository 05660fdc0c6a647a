//! Component classes and the scopes their hooks run in.
//!
//! A class is a closed description: a render function, an optional initial
//! state function, default props and a fixed set of lifecycle hook slots,
//! each either [`Hook::Absent`] or [`Hook::Present`].

use core::fmt;
use std::rc::Rc;

use crate::element::{Children, Element, ElementBuilder, ElementType, Owner};
use crate::error::UiError;
use crate::instance::InstanceId;
use crate::runtime::Ui;
use crate::transfer;
use crate::value::{Value, ValueMap, merge_into};

/// Lifecycle hooks without extra arguments (will-mount, did-mount, will-unmount).
pub type LifecycleFn = dyn Fn(&mut Scope<'_>);
/// Receives the incoming props.
pub type ReceivePropsFn = dyn Fn(&mut Scope<'_>, &ValueMap);
pub type GuardFn = dyn Fn(&UpdateArgs<'_>) -> bool;
/// Receives the props and state about to be committed.
pub type WillUpdateFn = dyn Fn(&mut Scope<'_>, &ValueMap, &ValueMap);
/// Receives the props and state that were replaced.
pub type DidUpdateFn = dyn Fn(&mut Scope<'_>, &ValueMap, &ValueMap);
pub type RenderFn = dyn Fn(&RenderScope<'_>) -> Result<Element, UiError>;
pub type InitialStateFn = dyn Fn(&ValueMap) -> ValueMap;
/// Completion callback, invoked with its instance bound.
pub type Callback = Box<dyn FnOnce(&mut Scope<'_>)>;

/// An optional capability of a component class.
pub enum Hook<F: ?Sized> {
    Absent,
    Present(Rc<F>),
}

impl<F: ?Sized> Hook<F> {
    pub fn get(&self) -> Option<Rc<F>> {
        match self {
            Self::Absent => None,
            Self::Present(hook) => Some(Rc::clone(hook)),
        }
    }

    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

impl<F: ?Sized> Default for Hook<F> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<F: ?Sized> Clone for Hook<F> {
    fn clone(&self) -> Self {
        match self {
            Self::Absent => Self::Absent,
            Self::Present(hook) => Self::Present(Rc::clone(hook)),
        }
    }
}

/// Current and incoming values handed to the should-update guard.
pub struct UpdateArgs<'args> {
    pub props: &'args ValueMap,
    pub state: &'args ValueMap,
    pub next_props: &'args ValueMap,
    pub next_state: &'args ValueMap,
}

#[derive(Default, Clone)]
pub struct Hooks {
    pub will_mount: Hook<LifecycleFn>,
    pub did_mount: Hook<LifecycleFn>,
    pub will_receive_props: Hook<ReceivePropsFn>,
    pub should_update: Hook<GuardFn>,
    pub will_update: Hook<WillUpdateFn>,
    pub did_update: Hook<DidUpdateFn>,
    pub will_unmount: Hook<LifecycleFn>,
}

pub struct ComponentClass {
    name: String,
    render: Rc<RenderFn>,
    initial_state: Hook<InitialStateFn>,
    default_props: ValueMap,
    hooks: Hooks,
}

impl ComponentClass {
    pub fn builder(
        name: &str,
        render: impl Fn(&RenderScope<'_>) -> Result<Element, UiError> + 'static,
    ) -> ComponentClassBuilder {
        ComponentClassBuilder {
            class: Self {
                name: name.to_owned(),
                render: Rc::new(render),
                initial_state: Hook::Absent,
                default_props: ValueMap::new(),
                hooks: Hooks::default(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    pub const fn default_props(&self) -> &ValueMap {
        &self.default_props
    }

    /// Start an element of this class.
    pub fn create(self: &Rc<Self>) -> ElementBuilder {
        ElementBuilder::new(ElementType::Composite(Rc::clone(self)))
    }

    pub(crate) fn render_fn(&self) -> Rc<RenderFn> {
        Rc::clone(&self.render)
    }

    pub(crate) fn initial_state(&self, props: &ValueMap) -> ValueMap {
        self.initial_state
            .get()
            .map_or_else(ValueMap::new, |init| init(props))
    }

    /// Element props layered over this class's defaults.
    pub(crate) fn resolve_props(&self, element: &Element) -> ValueMap {
        let mut props = self.default_props.clone();
        merge_into(&mut props, element.props());
        props
    }
}

impl fmt::Debug for ComponentClass {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ComponentClass")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

pub struct ComponentClassBuilder {
    class: ComponentClass,
}

impl ComponentClassBuilder {
    #[must_use]
    pub fn initial_state(mut self, init: impl Fn(&ValueMap) -> ValueMap + 'static) -> Self {
        self.class.initial_state = Hook::Present(Rc::new(init));
        self
    }

    #[must_use]
    pub fn default_props(mut self, props: ValueMap) -> Self {
        self.class.default_props = props;
        self
    }

    #[must_use]
    pub fn will_mount(mut self, hook: impl Fn(&mut Scope<'_>) + 'static) -> Self {
        self.class.hooks.will_mount = Hook::Present(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn did_mount(mut self, hook: impl Fn(&mut Scope<'_>) + 'static) -> Self {
        self.class.hooks.did_mount = Hook::Present(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn will_receive_props(mut self, hook: impl Fn(&mut Scope<'_>, &ValueMap) + 'static) -> Self {
        self.class.hooks.will_receive_props = Hook::Present(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn should_update(mut self, guard: impl Fn(&UpdateArgs<'_>) -> bool + 'static) -> Self {
        self.class.hooks.should_update = Hook::Present(Rc::new(guard));
        self
    }

    #[must_use]
    pub fn will_update(
        mut self,
        hook: impl Fn(&mut Scope<'_>, &ValueMap, &ValueMap) + 'static,
    ) -> Self {
        self.class.hooks.will_update = Hook::Present(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn did_update(
        mut self,
        hook: impl Fn(&mut Scope<'_>, &ValueMap, &ValueMap) + 'static,
    ) -> Self {
        self.class.hooks.did_update = Hook::Present(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn will_unmount(mut self, hook: impl Fn(&mut Scope<'_>) + 'static) -> Self {
        self.class.hooks.will_unmount = Hook::Present(Rc::new(hook));
        self
    }

    pub fn build(self) -> Rc<ComponentClass> {
        Rc::new(self.class)
    }
}

/// Mutable access for lifecycle hooks and callbacks.
///
/// Mutations requested through a scope are queued on the open batch; they are
/// never applied inline.
pub struct Scope<'ui> {
    ui: &'ui mut Ui,
    id: InstanceId,
}

impl<'ui> Scope<'ui> {
    pub(crate) const fn new(ui: &'ui mut Ui, id: InstanceId) -> Self {
        Self { ui, id }
    }

    pub const fn id(&self) -> InstanceId {
        self.id
    }

    pub fn props(&self) -> &ValueMap {
        self.ui.props_or_empty(self.id)
    }

    pub fn state(&self) -> &ValueMap {
        self.ui.state_or_empty(self.id)
    }

    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props().get(name)
    }

    pub fn state_value(&self, name: &str) -> Option<&Value> {
        self.state().get(name)
    }

    pub fn set_state(&mut self, partial: ValueMap) {
        self.ui.enqueue_state(self.id, partial, None);
    }

    pub fn set_state_with(&mut self, partial: ValueMap, callback: impl FnOnce(&mut Scope<'_>) + 'static) {
        self.ui.enqueue_state(self.id, partial, Some(Box::new(callback)));
    }

    pub fn force_update(&mut self) {
        self.ui.enqueue_force(self.id, None);
    }

    pub fn force_update_with(&mut self, callback: impl FnOnce(&mut Scope<'_>) + 'static) {
        self.ui.enqueue_force(self.id, Some(Box::new(callback)));
    }

    pub fn get_ref(&self, name: &str) -> Option<InstanceId> {
        self.ui.get_ref(self.id, name)
    }

    pub fn is_mounted(&self) -> bool {
        self.ui.is_mounted(self.id)
    }

    pub fn ui(&self) -> &Ui {
        self.ui
    }

    pub fn ui_mut(&mut self) -> &mut Ui {
        self.ui
    }
}

/// Read-only access for render functions.
pub struct RenderScope<'ui> {
    ui: &'ui Ui,
    id: InstanceId,
}

impl<'ui> RenderScope<'ui> {
    pub(crate) const fn new(ui: &'ui Ui, id: InstanceId) -> Self {
        Self { ui, id }
    }

    pub const fn id(&self) -> InstanceId {
        self.id
    }

    pub fn props(&self) -> &ValueMap {
        self.ui.props_or_empty(self.id)
    }

    pub fn state(&self) -> &ValueMap {
        self.ui.state_or_empty(self.id)
    }

    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props().get(name)
    }

    pub fn state_value(&self, name: &str) -> Option<&Value> {
        self.state().get(name)
    }

    /// Children of the element this instance was rendered from.
    pub fn children(&self) -> Children {
        self.ui
            .instance(self.id)
            .map(|instance| instance.element().children().clone())
            .unwrap_or_default()
    }

    pub fn get_ref(&self, name: &str) -> Option<InstanceId> {
        self.ui.get_ref(self.id, name)
    }

    pub const fn ui(&self) -> &Ui {
        self.ui
    }

    /// Declare `name` as a ref to `element` on this instance.
    ///
    /// # Errors
    /// [`UiError::RefOwnershipViolation`] if the element was produced by
    /// another owner (e.g. it arrived through props or children).
    pub fn attach_ref(&self, name: &str, element: impl Into<Element>) -> Result<Element, UiError> {
        let element = element.into();
        if !self.owns(&element) {
            return Err(UiError::RefOwnershipViolation(format!(
                "{} cannot add ref \"{name}\" to {}",
                self.ui.class_name(self.id).unwrap_or_default(),
                element.display_name()
            )));
        }
        Ok(element.rebuild(
            element.props().clone(),
            element.key().map(str::to_owned),
            Some(name.to_owned()),
        ))
    }

    /// Merge this instance's props into an element it renders.
    ///
    /// # Errors
    /// [`UiError::OwnershipViolation`] if the element was produced by another owner.
    pub fn transfer_props_to(&self, element: impl Into<Element>) -> Result<Element, UiError> {
        let element = element.into();
        if !self.owns(&element) {
            return Err(UiError::OwnershipViolation(format!(
                "{} cannot transfer props to {}, which it does not own; \
                 this usually means it was passed in as props or children",
                self.ui.class_name(self.id).unwrap_or_default(),
                element.display_name()
            )));
        }
        Ok(transfer::transfer_props(self.props(), &element))
    }

    fn owns(&self, element: &Element) -> bool {
        match element.owner() {
            Owner::Unclaimed => true,
            Owner::Instance(owner) => owner == self.id,
            Owner::TopLevel => false,
        }
    }
}
