//! Callback table for properties and actions.

use heapless::{String, Vec};

use super::Error;
use super::credentials::MAX_ID_LEN;
use super::json::Params;

/// Default number of callback slots.
pub const DEFAULT_CALLBACKS: usize = 20;

/// Outcome reported by a handler.
///
/// For actions it becomes the `code` and `status` of the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    /// `0` means success.
    pub code: i32,
    /// Short status text.
    pub status: &'static str,
}

impl Reply {
    /// `{code: 0, status: "SUCC"}`.
    pub const SUCCESS: Reply = Reply { code: 0, status: "SUCC" };

    /// A reply with the given code and status.
    pub const fn new(code: i32, status: &'static str) -> Self {
        Self { code, status }
    }

    /// Whether `code` is zero.
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

impl Default for Reply {
    fn default() -> Self {
        Self::SUCCESS
    }
}

/// Something that reacts to a property change or action invocation.
///
/// Any `FnMut(Params<'_>) -> Reply` closure is a handler:
///
/// ```rust
/// use thinglink::thing::{CallbackRegistry, Kind, Params, Reply};
///
/// let mut level = 0u8;
/// let mut on_level = |params: Params<'_>| {
///     level = params.get("level").unwrap_or(0);
///     Reply::SUCCESS
/// };
///
/// let mut registry: CallbackRegistry<'_, 4> = CallbackRegistry::new();
/// registry.bind("level", Kind::Property, &mut on_level).unwrap();
/// assert!(registry.contains("level"));
/// ```
pub trait Handler {
    /// Handle the `params` object of an inbound message.
    fn handle(&mut self, params: Params<'_>) -> Reply;
}

impl<F> Handler for F
where
    F: FnMut(Params<'_>) -> Reply,
{
    fn handle(&mut self, params: Params<'_>) -> Reply {
        self(params)
    }
}

/// What a callback is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Invoked when a property-down message carries the id in `params`.
    Property,
    /// Invoked when an action-down message names the id in `actionId`.
    Action,
}

struct Entry<'h> {
    id: String<MAX_ID_LEN>,
    kind: Kind,
    handler: &'h mut dyn Handler,
}

/// Fixed-capacity table from identifier to handler.
///
/// Identifiers are unique across both kinds. Entries are never removed and
/// are visited in binding order.
pub struct CallbackRegistry<'h, const N: usize = DEFAULT_CALLBACKS> {
    entries: Vec<Entry<'h>, N>,
}

impl<'h, const N: usize> CallbackRegistry<'h, N> {
    /// An empty table.
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Bind `handler` to `id`.
    ///
    /// # Errors
    ///
    /// * [`Error::DuplicateId`] - `id` is already bound, whatever its kind
    /// * [`Error::RegistryFull`] - all `N` slots are taken
    /// * [`Error::IdentifierTooLong`] - `id` is longer than [`MAX_ID_LEN`]
    pub fn bind(&mut self, id: &str, kind: Kind, handler: &'h mut dyn Handler) -> Result<(), Error> {
        if self.contains(id) {
            warn!("callback id already bound");
            return Err(Error::DuplicateId);
        }
        if self.entries.is_full() {
            warn!("callback table full");
            return Err(Error::RegistryFull);
        }
        let id = String::try_from(id).map_err(|_| Error::IdentifierTooLong)?;
        self.entries
            .push(Entry { id, kind, handler })
            .map_err(|_| Error::RegistryFull)
    }

    /// Whether `id` is bound.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// The kind `id` is bound as.
    pub fn kind_of(&self, id: &str) -> Option<Kind> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.kind)
    }

    /// Number of bound callbacks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        N
    }

    /// Run the action handler bound to `id`, if any.
    pub fn invoke_action(&mut self, id: &str, params: Params<'_>) -> Option<Reply> {
        self.entries
            .iter_mut()
            .find(|entry| entry.kind == Kind::Action && entry.id == id)
            .map(|entry| entry.handler.handle(params))
    }

    /// Run every property handler whose id is a key of `params`.
    ///
    /// Handlers run in binding order, each receiving the whole object.
    /// Returns how many ran and a combined reply: the first failure, or the
    /// last reply when all succeeded.
    pub fn invoke_properties(&mut self, params: Params<'_>) -> (usize, Option<Reply>) {
        let mut invoked = 0;
        let mut combined: Option<Reply> = None;
        for entry in self.entries.iter_mut() {
            if entry.kind != Kind::Property || !params.contains_key(&entry.id) {
                continue;
            }
            let reply = entry.handler.handle(params);
            invoked += 1;
            combined = match combined {
                Some(failed) if !failed.is_success() => Some(failed),
                _ => Some(reply),
            };
        }
        (invoked, combined)
    }
}

impl<const N: usize> Default for CallbackRegistry<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for CallbackRegistry<'_, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| (entry.id.as_str(), entry.kind)))
            .finish()
    }
}
