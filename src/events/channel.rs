use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use log::trace;

use super::EventHandler;

pub type Callback<T> = Rc<dyn Fn(&T)>;
pub type SubscriptionId = u64;

type Listeners<T> = RefCell<BTreeMap<SubscriptionId, Callback<T>>>;

pub struct EventEmitter<T: std::fmt::Debug> {
    channel: Channel<T>,
}

impl<T: std::fmt::Debug> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

pub struct EventObserver<T: std::fmt::Debug> {
    channel: Channel<T>,
}

impl<T: std::fmt::Debug> Clone for EventObserver<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

/// Handle returned by [`EventObserver::subscribe`]; dropping it keeps the
/// listener alive, calling `unsubscribe` removes it.
pub struct Unsubscriber<T: std::fmt::Debug> {
    listeners: Weak<Listeners<T>>,
    id: SubscriptionId,
}

impl<T: std::fmt::Debug> Unsubscriber<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn unsubscribe(self) -> bool {
        match self.listeners.upgrade() {
            Some(listeners) => listeners.borrow_mut().remove(&self.id).is_some(),
            None => false,
        }
    }
}

pub struct Channel<T: std::fmt::Debug> {
    listeners: Rc<Listeners<T>>,
    next_id: Rc<RefCell<SubscriptionId>>,
}

impl<T: std::fmt::Debug> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: Rc::clone(&self.listeners),
            next_id: Rc::clone(&self.next_id),
        }
    }
}

impl<T: std::fmt::Debug + 'static> Channel<T> {
    pub fn new() -> (EventEmitter<T>, EventObserver<T>) {
        let channel = Channel {
            listeners: Rc::new(RefCell::new(BTreeMap::new())),
            next_id: Rc::new(RefCell::new(0)),
        };
        (
            EventEmitter {
                channel: channel.clone(),
            },
            EventObserver { channel },
        )
    }

    fn subscribe<F>(&self, callback: F) -> Unsubscriber<T>
    where
        F: Fn(&T) + 'static,
    {
        let id = {
            let mut next_id = self.next_id.borrow_mut();
            let id = *next_id;
            *next_id += 1;
            id
        };
        self.listeners.borrow_mut().insert(id, Rc::new(callback));
        Unsubscriber {
            listeners: Rc::downgrade(&self.listeners),
            id,
        }
    }

    fn emit(&self, data: &T) {
        // snapshot the listeners so a callback may (un)subscribe while we iterate
        let listeners: Vec<Callback<T>> = self.listeners.borrow().values().cloned().collect();
        trace!(target: "events", "Emitting event to {} listeners: {:?}", listeners.len(), data);
        for listener in listeners {
            listener(data);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }
}

impl<T: std::fmt::Debug + 'static> EventEmitter<T> {
    pub fn emit(&self, data: T) {
        self.channel.emit(&data);
    }

    pub fn listener_count(&self) -> usize {
        self.channel.listener_count()
    }
}

impl<T: std::fmt::Debug + 'static> EventObserver<T> {
    pub fn subscribe<F>(&self, callback: F) -> Unsubscriber<T>
    where
        F: Fn(&T) + 'static,
    {
        self.channel.subscribe(callback)
    }

    /// Routes every event into `handler`. The handler must not be mutably
    /// borrowed elsewhere while an event is being emitted.
    pub fn subscribe_handler<H>(&self, handler: Rc<RefCell<H>>) -> Unsubscriber<T>
    where
        H: EventHandler<T> + 'static,
    {
        self.channel
            .subscribe(move |event| handler.borrow_mut().handle_event(event))
    }
}
