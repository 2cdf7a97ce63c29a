//! Search listeners.
//!
//! Listeners observe the search synchronously, in registration order. They
//! receive read-only views; the engine keeps exclusive ownership of the
//! population, archive and budget.

use crate::archive::GoalArchive;
use crate::candidate::Individual;
use crate::engine::Phase;

/// Read-only view of the engine passed to listeners.
#[derive(Debug)]
pub struct SearchView<'a, C> {
    /// Completed generations.
    pub generation: usize,
    /// Fitness evaluations so far.
    pub evaluations: u64,
    /// Current lifecycle phase.
    pub phase: Phase,
    /// Current population.
    pub population: &'a [Individual<C>],
    /// Goal archive.
    pub archive: &'a GoalArchive<C>,
}

/// Observer of search events. Every method defaults to a no-op.
pub trait SearchListener<C> {
    fn on_search_started(&mut self, _view: &SearchView<'_, C>) {}

    /// Called after every completed generation.
    fn on_generation(&mut self, _view: &SearchView<'_, C>) {}

    fn on_search_finished(&mut self, _view: &SearchView<'_, C>) {}

    /// Called after an individual was evaluated.
    fn on_evaluation(&mut self, _individual: &Individual<C>) {}

    /// Called right before an individual is mutated.
    fn on_mutation(&mut self, _individual: &Individual<C>) {}
}

/// Listeners keyed by a stable id, notified in insertion order.
pub struct ListenerBus<C> {
    listeners: Vec<(String, Box<dyn SearchListener<C>>)>,
}

impl<C> Default for ListenerBus<C> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<C> std::fmt::Debug for ListenerBus<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerBus")
            .field("ids", &self.ids().collect::<Vec<_>>())
            .finish()
    }
}

impl<C> ListenerBus<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. Returns `false` (and drops `listener`) if the
    /// id is already taken.
    pub fn register(&mut self, id: impl Into<String>, listener: Box<dyn SearchListener<C>>) -> bool {
        let id = id.into();
        if self.contains(&id) {
            log::debug!("listener '{id}' already registered");
            return false;
        }
        self.listeners.push((id, listener));
        true
    }

    /// Removes and returns the listener registered under `id`.
    pub fn remove(&mut self, id: &str) -> Option<Box<dyn SearchListener<C>>> {
        let pos = self.listeners.iter().position(|(k, _)| k == id)?;
        Some(self.listeners.remove(pos).1)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.listeners.iter().any(|(k, _)| k == id)
    }

    /// Registered ids in notification order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.listeners.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn search_started(&mut self, view: &SearchView<'_, C>) {
        for (_, l) in &mut self.listeners {
            l.on_search_started(view);
        }
    }

    pub fn generation(&mut self, view: &SearchView<'_, C>) {
        for (_, l) in &mut self.listeners {
            l.on_generation(view);
        }
    }

    pub fn search_finished(&mut self, view: &SearchView<'_, C>) {
        for (_, l) in &mut self.listeners {
            l.on_search_finished(view);
        }
    }

    pub fn evaluation(&mut self, individual: &Individual<C>) {
        for (_, l) in &mut self.listeners {
            l.on_evaluation(individual);
        }
    }

    pub fn mutation(&mut self, individual: &Individual<C>) {
        for (_, l) in &mut self.listeners {
            l.on_mutation(individual);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::Direction;
    use crate::test_support::BitString;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl SearchListener<BitString> for Recorder {
        fn on_generation(&mut self, view: &SearchView<'_, BitString>) {
            self.log
                .borrow_mut()
                .push(format!("{}:gen{}", self.name, view.generation));
        }

        fn on_evaluation(&mut self, individual: &Individual<BitString>) {
            self.log
                .borrow_mut()
                .push(format!("{}:eval{}", self.name, individual.id()));
        }
    }

    fn recorder(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Box<dyn SearchListener<BitString>> {
        Box::new(Recorder {
            name,
            log: Rc::clone(log),
        })
    }

    #[test]
    fn test_registration_order_and_dedup() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = ListenerBus::new();
        assert!(bus.register("b", recorder("b", &log)));
        assert!(bus.register("a", recorder("a", &log)));
        assert!(!bus.register("b", recorder("dup", &log)));
        assert_eq!(bus.ids().collect::<Vec<_>>(), vec!["b", "a"]);

        let archive = GoalArchive::new(Direction::Minimize);
        let population = vec![Individual::new(0, BitString::zeros(2), 1)];
        let view = SearchView {
            generation: 4,
            evaluations: 0,
            phase: Phase::Evolving,
            population: &population,
            archive: &archive,
        };
        bus.generation(&view);
        bus.evaluation(&population[0]);
        assert_eq!(
            *log.borrow(),
            vec!["b:gen4", "a:gen4", "b:eval0", "a:eval0"]
        );
    }

    #[test]
    fn test_remove() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = ListenerBus::new();
        bus.register("x", recorder("x", &log));
        assert!(bus.remove("x").is_some());
        assert!(bus.remove("x").is_none());
        assert!(bus.is_empty());
        bus.evaluation(&Individual::new(1, BitString::zeros(2), 1));
        assert!(log.borrow().is_empty());
    }
}
