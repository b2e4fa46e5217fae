use super::value::Value;

/// One registered callback: the instance it targets and the method it calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Listener {
    pub target: Value,
    pub method: String,
}

/// Ordered callback list with indexed access to each listener's target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListenerList {
    listeners: Vec<Listener>,
}

impl ListenerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, target: Value, method: impl Into<String>) {
        self.listeners.push(Listener {
            target,
            method: method.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn listener_target(&self, index: usize) -> Option<&Value> {
        self.listeners.get(index).map(|listener| &listener.target)
    }

    /// Replaces the target of listener `index`. Returns false when out of range.
    pub fn set_listener_target(&mut self, index: usize, target: Value) -> bool {
        match self.listeners.get_mut(index) {
            Some(listener) => {
                listener.target = target;
                true
            }
            None => false,
        }
    }

    pub fn method(&self, index: usize) -> Option<&str> {
        self.listeners
            .get(index)
            .map(|listener| listener.method.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Listener> {
        self.listeners.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::ObjectHandle;

    #[test]
    fn targets_are_replaced_in_place() {
        let mut list = ListenerList::new();
        list.push(Value::None, "open");
        list.push(Value::Object(ObjectHandle(3)), "close");

        assert!(list.set_listener_target(0, Value::Object(ObjectHandle(9))));
        assert_eq!(list.listener_target(0), Some(&Value::Object(ObjectHandle(9))));
        assert_eq!(list.method(0), Some("open"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn out_of_range_target_is_rejected() {
        let mut list = ListenerList::new();
        list.push(Value::None, "open");
        assert!(!list.set_listener_target(1, Value::Bool(true)));
        assert_eq!(list.listener_target(1), None);
    }
}
