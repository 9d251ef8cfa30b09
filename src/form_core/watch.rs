use super::path;
use serde_json::Value as JsonValue;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchFilter {
    All,
    Paths(Vec<String>),
}

impl WatchFilter {
    fn matches(&self, name: Option<&str>) -> bool {
        match (self, name) {
            (WatchFilter::All, _) => true,
            // resets and bulk updates reach every subscriber
            (WatchFilter::Paths(_), None) => true,
            (WatchFilter::Paths(ps), Some(n)) => ps.iter().any(|p| path::overlaps(p, n)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Input,
    SetValue,
    ArrayAppend,
    ArrayRemove,
    Reset,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchEvent {
    pub name: Option<String>,
    pub kind: ChangeKind,
}

type Callback = Box<dyn FnMut(&JsonValue, &WatchEvent)>;

struct Sub {
    id: u64,
    filter: WatchFilter,
    alive: Rc<Cell<bool>>,
    callback: Rc<RefCell<Callback>>,
}

#[derive(Default)]
struct HubInner {
    next_id: u64,
    subs: Vec<Sub>,
}

/// Observer registry. Deliveries are synchronous and outside the render path.
#[derive(Default)]
pub struct WatchHub {
    inner: Rc<RefCell<HubInner>>,
}

impl WatchHub {
    pub fn subscribe(
        &self,
        filter: WatchFilter,
        callback: impl FnMut(&JsonValue, &WatchEvent) + 'static,
    ) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        inner.subs.retain(|s| s.alive.get());
        inner.next_id += 1;
        let id = inner.next_id;
        let alive = Rc::new(Cell::new(true));
        inner.subs.push(Sub {
            id,
            filter,
            alive: alive.clone(),
            callback: Rc::new(RefCell::new(Box::new(callback))),
        });
        Subscription {
            id,
            alive,
            hub: Rc::downgrade(&self.inner),
        }
    }

    pub fn notify(&self, values: &JsonValue, event: &WatchEvent) {
        // Snapshot first so callbacks may drop their own subscription.
        let targets: Vec<(Rc<Cell<bool>>, Rc<RefCell<Callback>>)> = self
            .inner
            .borrow()
            .subs
            .iter()
            .filter(|s| s.filter.matches(event.name.as_deref()))
            .map(|s| (s.alive.clone(), s.callback.clone()))
            .collect();
        for (alive, cb) in targets {
            if !alive.get() {
                continue;
            }
            if let Ok(mut f) = cb.try_borrow_mut() {
                (f)(values, event);
            }
        }
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.inner.borrow().subs.len()
    }
}

/// Disposer returned by `watch`. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    alive: Rc<Cell<bool>>,
    hub: Weak<RefCell<HubInner>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.alive.set(false);
        if let Some(inner) = self.hub.upgrade() {
            if let Ok(mut inner) = inner.try_borrow_mut() {
                inner.subs.retain(|s| s.id != self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ev(name: Option<&str>) -> WatchEvent {
        WatchEvent {
            name: name.map(|s| s.to_string()),
            kind: ChangeKind::SetValue,
        }
    }

    #[test]
    fn filtered_subscriber_only_sees_matching_paths() {
        let hub = WatchHub::default();
        let seen = Rc::new(RefCell::new(Vec::<String>::new()));
        let s2 = seen.clone();
        let _sub = hub.subscribe(WatchFilter::Paths(vec!["social".into()]), move |_, e| {
            s2.borrow_mut()
                .push(e.name.clone().unwrap_or_else(|| "*".into()));
        });
        hub.notify(&json!({}), &ev(Some("social.twitter")));
        hub.notify(&json!({}), &ev(Some("username")));
        hub.notify(&json!({}), &ev(None));
        assert_eq!(*seen.borrow(), vec!["social.twitter", "*"]);
    }

    #[test]
    fn dropped_subscription_gets_no_more_deliveries() {
        let hub = WatchHub::default();
        let count = Rc::new(Cell::new(0));
        let c2 = count.clone();
        let sub = hub.subscribe(WatchFilter::All, move |_, _| c2.set(c2.get() + 1));
        hub.notify(&json!({}), &ev(Some("username")));
        sub.unsubscribe();
        hub.notify(&json!({}), &ev(Some("username")));
        assert_eq!(count.get(), 1);
        assert_eq!(hub.len(), 0);
    }

    #[test]
    fn subscription_released_mid_delivery_is_skipped() {
        let hub = WatchHub::default();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let count = Rc::new(Cell::new(0));
        let slot2 = slot.clone();
        let _first = hub.subscribe(WatchFilter::All, move |_, _| {
            slot2.borrow_mut().take();
        });
        let c2 = count.clone();
        *slot.borrow_mut() = Some(hub.subscribe(WatchFilter::All, move |_, _| {
            c2.set(c2.get() + 1)
        }));
        hub.notify(&json!({}), &ev(Some("username")));
        assert_eq!(count.get(), 0);
    }
}
