//! Registre des devices découverts, avec abonnement et rejeu.

use crate::device::UpnpDevice;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::mpsc::error::TryRecvError;

#[derive(Default)]
struct Devices {
    by_key: HashMap<String, Arc<UpnpDevice>>,
    order: Vec<Arc<UpnpDevice>>,
}

/// Devices uniques par adresse, jamais retirés.
///
/// Un abonné reçoit d'abord tous les devices déjà connus, dans l'ordre
/// d'insertion, puis chaque nouveau device. L'insertion publie sous le
/// verrou d'écriture et l'abonnement rejoue sous le verrou de lecture :
/// aucun device ne peut être manqué ni reçu deux fois.
#[derive(Default)]
pub struct DeviceRegistry {
    devices: RwLock<Devices>,
    subscribers: Mutex<HashMap<u64, UnboundedSender<Arc<UpnpDevice>>>>,
    next_id: AtomicU64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insère le device si son adresse est inconnue.
    ///
    /// Retourne le device inséré, ou `None` si un device de même adresse
    /// était déjà présent.
    pub fn insert(&self, device: UpnpDevice) -> Option<Arc<UpnpDevice>> {
        let key = device.registry_key();
        let mut devices = self.devices.write();
        if devices.by_key.contains_key(&key) {
            return None;
        }

        let device = Arc::new(device);
        devices.by_key.insert(key, device.clone());
        devices.order.push(device.clone());

        let subscribers = self.subscribers.lock();
        for sender in subscribers.values() {
            let _ = sender.send(device.clone());
        }

        Some(device)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.devices.read().by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.devices.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copie des devices, dans l'ordre d'insertion.
    pub fn snapshot(&self) -> Vec<Arc<UpnpDevice>> {
        self.devices.read().order.clone()
    }

    pub fn subscribe(self: &Arc<Self>) -> DeviceSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let devices = self.devices.read();
        for device in &devices.order {
            let _ = sender.send(device.clone());
        }
        self.subscribers.lock().insert(id, sender);
        drop(devices);

        DeviceSubscription {
            id,
            receiver,
            registry: Arc::downgrade(self),
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.subscribers.lock().remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

/// Abonnement aux devices découverts ; se désabonne à la destruction.
pub struct DeviceSubscription {
    id: u64,
    receiver: UnboundedReceiver<Arc<UpnpDevice>>,
    registry: Weak<DeviceRegistry>,
}

impl DeviceSubscription {
    pub async fn recv(&mut self) -> Option<Arc<UpnpDevice>> {
        self.receiver.recv().await
    }

    /// Prochain device déjà publié, sans attendre.
    pub fn try_recv(&mut self) -> Option<Arc<UpnpDevice>> {
        match self.receiver.try_recv() {
            Ok(device) => Some(device),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn unsubscribe(self) {}
}

impl Drop for DeviceSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.id);
        }
    }
}
