use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

/// Maintains a mapping from keys to the bounded queues on which their items are delivered.
///
/// Each key has at most one live receiver. Items for a key are delivered in the order `deliver`
/// is called, and delivery waits for queue capacity rather than dropping.
pub struct Mailboxes<Key, Item> {
    map: Arc<Mutex<HashMap<Key, mpsc::Sender<Item>>>>,
    capacity: usize,
}

impl<Key, Item> Mailboxes<Key, Item>
where
    Key: Clone + Eq + Hash,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            map: Default::default(),
            capacity,
        }
    }

    /// Creates the queue for `key`. Returns `None` if a live receiver already exists.
    pub fn register(&self, key: Key) -> Option<mpsc::Receiver<Item>> {
        let mut map = self.map.lock().expect("poisoned");

        if let Some(sender) = map.get(&key) {
            if !sender.is_closed() {
                return None;
            }
        }

        let (sender, receiver) = mpsc::channel(self.capacity);
        map.insert(key, sender);
        Some(receiver)
    }

    /// Queues `item` for `key`, handing it back if nobody is listening.
    pub async fn deliver(&self, key: &Key, item: Item) -> Result<(), Item> {
        let sender = match self.map.lock().expect("poisoned").get(key) {
            Some(sender) => sender.clone(),
            None => return Err(item),
        };

        match sender.send(item).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendError(item)) => {
                self.remove_closed(key);
                Err(item)
            }
        }
    }

    fn remove_closed(&self, key: &Key) {
        let mut map = self.map.lock().expect("poisoned");
        if map.get(key).map_or(false, |sender| sender.is_closed()) {
            map.remove(key);
        }
    }
}

impl<Key, Item> Clone for Mailboxes<Key, Item> {
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
            capacity: self.capacity,
        }
    }
}
