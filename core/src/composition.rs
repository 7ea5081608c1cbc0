//! Reducer composition utilities
//!
//! The application state is the keyed union of independent slices. This module
//! builds the application reducer from an explicit registration list:
//! - **`combine_reducers`**: deliver every action to every registered reducer, in order
//! - **`scope_reducer`**: focus a slice reducer on one field of the application
//!   state and one variant of the application action
//!
//! # Examples
//!
//! ```
//! use std::sync::{Arc, LazyLock};
//! use storefront_state_core::{smallvec, SmallVec, effect::Effect, reducer::Reducer};
//! use storefront_state_core::composition::{combine_reducers, scope_reducer};
//! use storefront_state_core::slice::{Slice, Snapshot};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Wishlist {
//!     codes: Vec<String>,
//! }
//!
//! static EMPTY: LazyLock<Arc<Wishlist>> = LazyLock::new(|| Arc::new(Wishlist::default()));
//!
//! impl Slice for Wishlist {
//!     fn initial() -> Arc<Self> {
//!         Arc::clone(&EMPTY)
//!     }
//! }
//!
//! #[derive(Clone)]
//! enum WishlistAction {
//!     Add(String),
//! }
//!
//! struct WishlistReducer;
//!
//! impl Reducer for WishlistReducer {
//!     type State = Snapshot<Wishlist>;
//!     type Action = WishlistAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut Self::State, action: Self::Action, _env: &()) -> SmallVec<[Effect<Self::Action>; 4]> {
//!         let WishlistAction::Add(code) = action;
//!         state.update(|w| {
//!             let mut codes = w.codes.clone();
//!             codes.push(code);
//!             Wishlist { codes }
//!         });
//!         smallvec![]
//!     }
//! }
//!
//! #[derive(Clone, Default)]
//! struct AppState {
//!     wishlist: Snapshot<Wishlist>,
//! }
//!
//! #[derive(Clone)]
//! enum AppAction {
//!     Wishlist(WishlistAction),
//!     Logout,
//! }
//!
//! let app = combine_reducers(vec![Box::new(scope_reducer(
//!     WishlistReducer,
//!     |s: &AppState| &s.wishlist,
//!     |s: &mut AppState, w| s.wishlist = w,
//!     |a: AppAction| match a {
//!         AppAction::Wishlist(a) => Some(a),
//!         AppAction::Logout => None,
//!     },
//!     AppAction::Wishlist,
//! ))]);
//!
//! let mut state = AppState::default();
//! app.reduce(&mut state, AppAction::Wishlist(WishlistAction::Add("p1".into())), &());
//! assert_eq!(state.wishlist.codes, vec!["p1".to_string()]);
//!
//! // An action no slice recognizes leaves every slice reference untouched.
//! let before = state.wishlist.clone();
//! app.reduce(&mut state, AppAction::Logout, &());
//! assert!(Snapshot::ptr_eq(&before, &state.wishlist));
//! ```

use crate::effect::Effect;
use crate::reducer::Reducer;
use smallvec::SmallVec;

/// A boxed reducer over the application state, as held in a registration list.
pub type BoxedReducer<S, A, E> = Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Each reducer is run in registration order, and all effects are collected
/// and concatenated. Reducers never see each other's effects.
///
/// # Type Parameters
///
/// - `S`: The state type
/// - `A`: The action type
/// - `E`: The environment type
#[must_use]
pub fn combine_reducers<S, A, E>(reducers: Vec<BoxedReducer<S, A, E>>) -> CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    reducers: Vec<BoxedReducer<S, A, E>>,
}

impl<S, A, E> CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    /// Number of registered reducers
    #[must_use]
    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    /// Whether no reducer is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    S: 'static,
    A: Clone + 'static,
    E: 'static,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut all_effects = SmallVec::new();

        for reducer in &self.reducers {
            let effects = reducer.reduce(state, action.clone(), env);
            all_effects.extend(effects.into_iter().filter(|e: &Effect<A>| !e.is_none()));
        }

        all_effects
    }
}

/// Scopes a slice reducer to one field of a larger state and one variant of a
/// larger action.
///
/// Actions for which `extract_action` returns `None` are unrecognized by the
/// slice: its reducer is not called and the field keeps its reference.
/// Effects returned by the slice reducer are mapped back with `embed_action`.
///
/// # Type Parameters
///
/// - `S`: The parent state type
/// - `SubS`: The slice state type (a field of `S`)
/// - `A`: The parent action type
/// - `SubA`: The slice action type
/// - `E`: The environment type
pub fn scope_reducer<S, SubS, A, SubA, E, R>(
    reducer: R,
    get_state: fn(&S) -> &SubS,
    set_state: fn(&mut S, SubS),
    extract_action: fn(A) -> Option<SubA>,
    embed_action: fn(SubA) -> A,
) -> ScopedReducer<S, SubS, A, SubA, E, R>
where
    SubS: Clone,
    R: Reducer<State = SubS, Action = SubA, Environment = E>,
{
    ScopedReducer {
        reducer,
        get_state,
        set_state,
        extract_action,
        embed_action,
        _phantom: std::marker::PhantomData,
    }
}

/// A scoped reducer that operates on one slice of state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, A, SubA, E, R>
where
    R: Reducer<State = SubS, Action = SubA, Environment = E>,
{
    reducer: R,
    get_state: fn(&S) -> &SubS,
    set_state: fn(&mut S, SubS),
    extract_action: fn(A) -> Option<SubA>,
    embed_action: fn(SubA) -> A,
    _phantom: std::marker::PhantomData<fn() -> E>,
}

impl<S, SubS, A, SubA, E, R> Reducer for ScopedReducer<S, SubS, A, SubA, E, R>
where
    SubS: Clone,
    A: Send + 'static,
    SubA: Send + 'static,
    R: Reducer<State = SubS, Action = SubA, Environment = E>,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let Some(sub_action) = (self.extract_action)(action) else {
            return SmallVec::new();
        };

        // Slices are snapshots, so this clone is a reference count bump
        let mut sub_state = (self.get_state)(state).clone();

        let effects = self.reducer.reduce(&mut sub_state, sub_action, env);

        (self.set_state)(state, sub_state);

        effects
            .into_iter()
            .map(|effect| effect.map(self.embed_action))
            .collect()
    }
}
