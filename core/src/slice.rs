//! Immutable slice snapshots.
//!
//! A slice value is never mutated in place. Every transition swaps in a new
//! `Arc`, and a transition that changes nothing leaves the existing `Arc`
//! alone, so "did this slice change?" is a pointer comparison.
//!
//! The initial value of every slice is a single process-wide constant. Both
//! [`Snapshot::initial`] and [`Snapshot::reset`] hand out that same
//! allocation, which is what lets callers check `state === initialState`.

use crate::effect::Effect;
use crate::reducer::Reducer;
use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use std::ops::Deref;
use std::sync::Arc;

/// A state slice with a constant initial value.
///
/// Implementors keep the initial value in a `static LazyLock<Arc<Self>>` and
/// return a clone of that `Arc`, never a fresh allocation.
pub trait Slice: Send + Sync + 'static {
    /// The shared initial value of this slice.
    fn initial() -> Arc<Self>;
}

/// An immutable, reference-counted value of one slice.
pub struct Snapshot<T>(Arc<T>);

impl<T: Slice> Snapshot<T> {
    /// The initial snapshot; every call returns the same allocation.
    #[must_use]
    pub fn initial() -> Self {
        Self(T::initial())
    }

    /// Return to the initial value.
    pub fn reset(&mut self) {
        if !Arc::ptr_eq(&self.0, &T::initial()) {
            self.0 = T::initial();
        }
    }

    /// Whether this snapshot is the initial constant itself.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        Arc::ptr_eq(&self.0, &T::initial())
    }
}

impl<T> Snapshot<T> {
    /// Wrap a freshly built value.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Reference identity of two snapshots.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Swap in a new value.
    pub fn replace(&mut self, value: T) {
        self.0 = Arc::new(value);
    }

    /// Swap in the value computed from the current one.
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.0);
        self.0 = Arc::new(next);
    }

    /// The shared value.
    #[must_use]
    pub fn as_arc(&self) -> &Arc<T> {
        &self.0
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Slice> Default for Snapshot<T> {
    fn default() -> Self {
        Self::initial()
    }
}

impl<T: PartialEq> PartialEq for Snapshot<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl<T: Eq> Eq for Snapshot<T> {}

impl<T: std::fmt::Debug> std::fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: Serialize> Serialize for Snapshot<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Run a slice reducer against an optional current state.
///
/// `None` stands for "no state yet" and starts from [`Snapshot::initial`], so
/// `reduce_slice(&r, None, unrecognized, &env)` is the initial constant itself.
pub fn reduce_slice<R, T, A, E>(
    reducer: &R,
    current: Option<Snapshot<T>>,
    action: A,
    env: &E,
) -> (Snapshot<T>, SmallVec<[Effect<A>; 4]>)
where
    R: Reducer<State = Snapshot<T>, Action = A, Environment = E>,
    T: Slice,
{
    let mut state = current.unwrap_or_else(Snapshot::initial);
    let effects = reducer.reduce(&mut state, action, env);
    (state, effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smallvec;
    use std::sync::LazyLock;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Tags {
        items: Vec<String>,
    }

    static INITIAL_TAGS: LazyLock<Arc<Tags>> = LazyLock::new(|| Arc::new(Tags::default()));

    impl Slice for Tags {
        fn initial() -> Arc<Self> {
            Arc::clone(&INITIAL_TAGS)
        }
    }

    enum TagsAction {
        Add(String),
        Clear,
        Ignored,
    }

    struct TagsReducer;

    impl Reducer for TagsReducer {
        type State = Snapshot<Tags>;
        type Action = TagsAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TagsAction::Add(tag) => state.update(|prev| {
                    let mut items = prev.items.clone();
                    items.push(tag);
                    Tags { items }
                }),
                TagsAction::Clear => state.reset(),
                TagsAction::Ignored => {},
            }
            smallvec![]
        }
    }

    #[test]
    fn initial_is_shared() {
        let a = Snapshot::<Tags>::initial();
        let b = Snapshot::<Tags>::default();
        assert!(Snapshot::ptr_eq(&a, &b));
        assert!(a.is_initial());
    }

    #[test]
    fn undefined_state_starts_from_initial() {
        let (state, effects) = reduce_slice(&TagsReducer, None, TagsAction::Ignored, &());
        assert!(Snapshot::ptr_eq(&state, &Snapshot::initial()));
        assert!(effects.is_empty());
    }

    #[test]
    fn no_op_keeps_reference() {
        let (state, _) = reduce_slice(&TagsReducer, None, TagsAction::Add("new".into()), &());
        let before = state.clone();
        let (after, _) = reduce_slice(&TagsReducer, Some(state), TagsAction::Ignored, &());
        assert!(Snapshot::ptr_eq(&before, &after));
    }

    #[test]
    fn transition_allocates_and_reset_returns_constant() {
        let mut state = Snapshot::<Tags>::initial();
        TagsReducer.reduce(&mut state, TagsAction::Add("sale".into()), &());
        assert!(!state.is_initial());
        assert_eq!(state.items, vec!["sale".to_string()]);

        TagsReducer.reduce(&mut state, TagsAction::Clear, &());
        assert!(state.is_initial());
    }

    #[test]
    fn equality_short_circuits_on_identity_then_compares_values() {
        let a = Snapshot::new(Tags { items: vec!["x".into()] });
        let b = Snapshot::new(Tags { items: vec!["x".into()] });
        assert!(!Snapshot::ptr_eq(&a, &b));
        assert_eq!(a, b);
        assert_eq!(a, a.clone());
    }
}
