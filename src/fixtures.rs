//! Aspects shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::aspect::{Aspect, Exposer, Membership};
use crate::entity::{Entity, EntityId};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// --- Person / ChessPlayer / Employee ---

pub struct Person {
    pub membership: Membership,
    pub name: String,
}

impl Aspect for Person {
    fn membership(&self) -> Option<&Membership> {
        Some(&self.membership)
    }
}

pub fn person(name: &str) -> Arc<Person> {
    Arc::new(Person {
        membership: Membership::new(),
        name: name.to_string(),
    })
}

pub struct ChessPlayer {
    pub membership: Membership,
    pub rank: u8,
}

impl Aspect for ChessPlayer {
    fn membership(&self) -> Option<&Membership> {
        Some(&self.membership)
    }
}

pub fn chess_player(rank: u8) -> Arc<ChessPlayer> {
    Arc::new(ChessPlayer {
        membership: Membership::new(),
        rank,
    })
}

pub struct Employee {
    pub membership: Membership,
    pub rank: String,
}

impl Aspect for Employee {
    fn membership(&self) -> Option<&Membership> {
        Some(&self.membership)
    }
}

pub fn employee(rank: &str) -> Arc<Employee> {
    Arc::new(Employee {
        membership: Membership::new(),
        rank: rank.to_string(),
    })
}

// --- Apartments ---

pub trait Apt: Send + Sync {
    fn nbeds(&self) -> u32;
}

pub struct Apartment {
    pub membership: Membership,
    pub nbeds: u32,
}

impl Apt for Apartment {
    fn nbeds(&self) -> u32 {
        self.nbeds
    }
}

impl Aspect for Apartment {
    fn exposed_aspects(exposer: &mut Exposer<Self>) {
        exposer.expose::<dyn Apt>(|apt| apt);
    }

    fn membership(&self) -> Option<&Membership> {
        Some(&self.membership)
    }
}

pub fn apartment(nbeds: u32) -> Arc<Apartment> {
    Arc::new(Apartment {
        membership: Membership::new(),
        nbeds,
    })
}

/// A second `dyn Apt` provider, for conflicts.
pub struct Penthouse {
    pub membership: Membership,
    pub nbeds: u32,
}

impl Apt for Penthouse {
    fn nbeds(&self) -> u32 {
        self.nbeds
    }
}

impl Aspect for Penthouse {
    fn exposed_aspects(exposer: &mut Exposer<Self>) {
        exposer.expose::<dyn Apt>(|apt| apt);
    }

    fn membership(&self) -> Option<&Membership> {
        Some(&self.membership)
    }
}

// --- Rentals ---

pub trait Rentable: Send + Sync {
    fn rate(&self) -> f32;
}

pub trait Priced: Send + Sync {
    fn price(&self) -> f32;
}

pub struct Rental {
    pub membership: Membership,
    pub rate: f32,
    notified: AtomicUsize,
}

impl Rental {
    pub fn notifications(&self) -> usize {
        self.notified.load(Ordering::SeqCst)
    }
}

impl Rentable for Rental {
    fn rate(&self) -> f32 {
        self.rate
    }
}

impl Priced for Rental {
    fn price(&self) -> f32 {
        self.rate
    }
}

impl Aspect for Rental {
    fn exposed_aspects(exposer: &mut Exposer<Self>) {
        exposer.expose::<dyn Rentable>(|rental| rental);
    }

    fn membership(&self) -> Option<&Membership> {
        Some(&self.membership)
    }

    fn note_assigned_to(&self, entity: &Entity) {
        self.notified.fetch_add(1, Ordering::SeqCst);
        self.membership.assign(entity);
    }
}

pub fn rental(rate: f32) -> Arc<Rental> {
    Arc::new(Rental {
        membership: Membership::new(),
        rate,
        notified: AtomicUsize::new(0),
    })
}

// --- Misc ---

/// No membership, no exposures.
pub struct Plain;

impl Aspect for Plain {}

/// Exposes two capabilities and records every notification.
#[derive(Default)]
pub struct Tracker {
    assigned: Mutex<Vec<EntityId>>,
    bound_when_notified: Mutex<Option<bool>>,
}

impl Tracker {
    pub fn assigned_to(&self) -> Vec<EntityId> {
        self.assigned.lock().clone()
    }

    pub fn bound_when_notified(&self) -> Option<bool> {
        *self.bound_when_notified.lock()
    }
}

impl Apt for Tracker {
    fn nbeds(&self) -> u32 {
        1
    }
}

impl Rentable for Tracker {
    fn rate(&self) -> f32 {
        1.0
    }
}

impl Aspect for Tracker {
    fn exposed_aspects(exposer: &mut Exposer<Self>) {
        exposer
            .expose::<dyn Apt>(|tracker| tracker)
            .expose::<dyn Rentable>(|tracker| tracker);
    }

    fn note_assigned_to(&self, entity: &Entity) {
        self.assigned.lock().push(entity.id());
        let bound = entity.contains::<Tracker>()
            && entity.contains::<dyn Apt>()
            && entity.contains::<dyn Rentable>();
        *self.bound_when_notified.lock() = Some(bound);
    }
}
