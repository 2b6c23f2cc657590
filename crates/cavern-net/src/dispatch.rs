//! Type-keyed message dispatch.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use cavern_protocol::DynMessage;

type Handler<S, A> = Box<dyn Fn(&mut S, &dyn Any, A) + Send + Sync>;

struct Binding<S, A> {
    name: &'static str,
    handler: Handler<S, A>,
}

/// Maps message types to handlers and invokes them synchronously.
///
/// `S` is the state handlers mutate, `A` an extra argument passed along
/// with every call (the sender's [`ConnectionId`](crate::ConnectionId) on
/// the server, `()` on the client).
///
/// Lookup is by the message's exact runtime type. Binding the same type
/// again replaces the earlier handler.
///
/// ```rust
/// use cavern_net::Router;
/// use cavern_protocol::DynMessage;
///
/// #[derive(Debug)]
/// struct Ping(u32);
///
/// let router = Router::<Vec<u32>>::new().bind(|seen: &mut Vec<u32>, ping: &Ping, ()| {
///     seen.push(ping.0);
/// });
///
/// let mut seen = Vec::new();
/// let message: Box<dyn DynMessage> = Box::new(Ping(7));
/// assert!(router.call(&mut seen, &*message, ()));
/// assert_eq!(seen, [7]);
/// ```
pub struct Router<S, A = ()> {
    bindings: HashMap<TypeId, Binding<S, A>>,
}

impl<S: 'static, A: 'static> Router<S, A> {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Binds `handler` to messages of type `M`, replacing any earlier binding.
    pub fn bind<M: Any>(mut self, handler: impl Fn(&mut S, &M, A) + Send + Sync + 'static) -> Self {
        let name = short_name::<M>();
        let erased: Handler<S, A> = Box::new(move |state: &mut S, message: &dyn Any, arg: A| {
            if let Some(message) = message.downcast_ref::<M>() {
                handler(state, message, arg);
            }
        });
        if self
            .bindings
            .insert(TypeId::of::<M>(), Binding { name, handler: erased })
            .is_some()
        {
            tracing::debug!(message = name, "handler replaced");
        }
        self
    }

    /// Merges every binding of `other` into this router. `other` wins on
    /// conflicts.
    pub fn extend(mut self, other: Router<S, A>) -> Self {
        self.bindings.extend(other.bindings);
        self
    }

    /// Dispatches `message` to its handler.
    ///
    /// Returns `false`, and does nothing else, when no handler is bound to
    /// the message's type. Pass the message itself (`&*boxed`), not the box.
    pub fn call(&self, state: &mut S, message: &dyn DynMessage, arg: A) -> bool {
        let message = message.as_any();
        match self.bindings.get(&message.type_id()) {
            Some(binding) => {
                tracing::trace!(message = binding.name, "dispatching");
                (binding.handler)(state, message, arg);
                true
            }
            None => {
                tracing::debug!(type_id = ?message.type_id(), "no handler bound, message ignored");
                false
            }
        }
    }

    /// Whether a handler is bound to `M`.
    pub fn is_bound<M: Any>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<M>())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<S: 'static, A: 'static> Default for Router<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> fmt::Debug for Router<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.bindings.values().map(|b| b.name).collect();
        names.sort_unstable();
        f.debug_struct("Router").field("bindings", &names).finish()
    }
}

fn short_name<M>() -> &'static str {
    let full = std::any::type_name::<M>();
    // Strip the module path but keep generic arguments readable.
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(i) => &full[i + 2..],
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use cavern_protocol::BoxedMessage;

    use super::*;

    #[derive(Debug)]
    struct Ping;

    #[derive(Debug)]
    struct Pong(u8);

    #[derive(Default)]
    struct Log(Vec<String>);

    fn boxed<M: DynMessage>(m: M) -> BoxedMessage {
        Box::new(m)
    }

    #[test]
    fn test_call_invokes_bound_handler_with_arg() {
        let router = Router::<Log, u32>::new()
            .bind(|log: &mut Log, _: &Ping, from: u32| log.0.push(format!("ping from {from}")));

        let mut log = Log::default();
        assert!(router.call(&mut log, &*boxed(Ping), 3));
        assert_eq!(log.0, ["ping from 3"]);
    }

    #[test]
    fn test_unbound_message_is_a_no_op() {
        let router = Router::<Log>::new().bind(|log: &mut Log, _: &Ping, ()| log.0.push("ping".into()));

        let mut log = Log::default();
        assert!(!router.call(&mut log, &*boxed(Pong(1)), ()));
        assert!(log.0.is_empty());
    }

    #[test]
    fn test_rebinding_overwrites() {
        let router = Router::<Log>::new()
            .bind(|log: &mut Log, _: &Ping, ()| log.0.push("first".into()))
            .bind(|log: &mut Log, _: &Ping, ()| log.0.push("second".into()));
        assert_eq!(router.len(), 1);

        let mut log = Log::default();
        router.call(&mut log, &*boxed(Ping), ());
        assert_eq!(log.0, ["second"]);
    }

    #[test]
    fn test_extend_merges_and_later_wins() {
        let base = Router::<Log>::new()
            .bind(|log: &mut Log, _: &Ping, ()| log.0.push("base ping".into()))
            .bind(|log: &mut Log, p: &Pong, ()| log.0.push(format!("base pong {}", p.0)));
        let overrides = Router::<Log>::new().bind(|log: &mut Log, _: &Ping, ()| log.0.push("override ping".into()));

        let router = base.extend(overrides);
        assert_eq!(router.len(), 2);

        let mut log = Log::default();
        router.call(&mut log, &*boxed(Ping), ());
        router.call(&mut log, &*boxed(Pong(9)), ());
        assert_eq!(log.0, ["override ping", "base pong 9"]);
    }

    #[test]
    fn test_lookup_is_by_exact_type() {
        let router = Router::<Log>::new().bind(|log: &mut Log, _: &Ping, ()| log.0.push("ping".into()));
        assert!(router.is_bound::<Ping>());
        assert!(!router.is_bound::<Pong>());
        // The box is a different type from its contents.
        assert!(!router.is_bound::<BoxedMessage>());
    }

    #[test]
    fn test_short_name_keeps_generics() {
        assert_eq!(short_name::<Ping>(), "Ping");
        assert_eq!(short_name::<Option<u8>>(), "Option<u8>");
    }
}
