//! Découverte SSDP des passerelles, en exécution unique.
//!
//! Le premier appel à [`UpnpDiscoverer::discover`] lance la découverte ; tous
//! les appels suivants, pendant ou après l'exécution, partagent le même
//! résultat. La découverte n'est jamais relancée pour une même instance.

use crate::device::UpnpDevice;
use crate::discovery::registry::{DeviceRegistry, DeviceSubscription};
use crate::environment::NetworkEnvironment;
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::stream::{FuturesUnordered, StreamExt};
use igdupnp::ssdp::{SSDP_MULTICAST_ADDR, SSDP_MULTICAST_TTL, SSDP_PORT, encode_search_datagram};
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

const RECEIVE_BUFFER_SIZE: usize = 8192;

/// Devices connus à la fin d'une découverte.
pub type DiscoveredDevices = Arc<Vec<Arc<UpnpDevice>>>;

type SharedRun = Shared<BoxFuture<'static, DiscoveredDevices>>;

#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Durée totale de la découverte
    pub timeout: Duration,
    /// Pause quand aucun socket n'a de données
    pub idle_poll: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(60_000),
            idle_poll: Duration::from_millis(10),
        }
    }
}

enum RunState {
    NotStarted,
    Running(SharedRun),
    Completed(DiscoveredDevices),
}

/// Exécution de découverte, en cours ou terminée.
#[derive(Clone)]
pub struct DiscoveryRun {
    handle: RunHandle,
}

#[derive(Clone)]
enum RunHandle {
    Pending(SharedRun),
    Ready(DiscoveredDevices),
}

impl DiscoveryRun {
    pub fn is_completed(&self) -> bool {
        match &self.handle {
            RunHandle::Pending(run) => run.peek().is_some(),
            RunHandle::Ready(_) => true,
        }
    }

    /// Attend la fin de la découverte.
    pub async fn wait(self) -> DiscoveredDevices {
        match self.handle {
            RunHandle::Pending(run) => run.await,
            RunHandle::Ready(devices) => devices,
        }
    }
}

struct DiscovererInner {
    registry: Arc<DeviceRegistry>,
    environment: Arc<dyn NetworkEnvironment>,
    options: DiscoveryOptions,
    state: Mutex<RunState>,
}

/// Découverte SSDP des devices sur toutes les adresses IPv4 locales.
#[derive(Clone)]
pub struct UpnpDiscoverer {
    inner: Arc<DiscovererInner>,
}

impl UpnpDiscoverer {
    pub fn new(environment: Arc<dyn NetworkEnvironment>, options: DiscoveryOptions) -> Self {
        Self {
            inner: Arc::new(DiscovererInner {
                registry: Arc::new(DeviceRegistry::new()),
                environment,
                options,
                state: Mutex::new(RunState::NotStarted),
            }),
        }
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.inner.options
    }

    /// Lance la découverte si elle n'a pas encore commencé.
    ///
    /// Doit être appelé depuis un runtime tokio : la découverte tourne dans
    /// sa propre tâche.
    pub fn start(&self) -> DiscoveryRun {
        self.launch(None)
    }

    /// Comme [`UpnpDiscoverer::start`], avec une durée propre à cet appel.
    ///
    /// La durée ne compte que si cet appel lance la découverte ; sinon
    /// l'exécution en cours ou terminée est retournée telle quelle.
    pub fn start_with_timeout(&self, timeout: Duration) -> DiscoveryRun {
        self.launch(Some(timeout))
    }

    fn launch(&self, timeout: Option<Duration>) -> DiscoveryRun {
        let mut state = self.inner.state.lock();
        let handle = match &*state {
            RunState::Running(run) => RunHandle::Pending(run.clone()),
            RunState::Completed(devices) => RunHandle::Ready(devices.clone()),
            RunState::NotStarted => {
                let inner = self.inner.clone();
                let timeout = timeout.unwrap_or(inner.options.timeout);
                let task = tokio::spawn(async move { inner.run(timeout).await });
                let run: SharedRun = async move {
                    match task.await {
                        Ok(devices) => devices,
                        Err(e) => {
                            warn!("❌ SSDP discovery task failed: {}", e);
                            Arc::new(Vec::new())
                        }
                    }
                }
                .boxed()
                .shared();
                *state = RunState::Running(run.clone());
                RunHandle::Pending(run)
            }
        };
        DiscoveryRun { handle }
    }

    /// Découvre les devices (ou retourne le résultat de la découverte déjà
    /// lancée).
    pub async fn discover(&self) -> DiscoveredDevices {
        self.start().wait().await
    }

    pub async fn discover_with_timeout(&self, timeout: Duration) -> DiscoveredDevices {
        self.start_with_timeout(timeout).wait().await
    }

    pub fn is_completed(&self) -> bool {
        matches!(*self.inner.state.lock(), RunState::Completed(_))
    }

    pub fn discovered_devices(&self) -> Vec<Arc<UpnpDevice>> {
        self.inner.registry.snapshot()
    }

    pub fn device_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Abonnement aux devices : rejoue les devices connus puis suit les
    /// nouveaux.
    pub fn subscribe(&self) -> DeviceSubscription {
        self.inner.registry.subscribe()
    }

    /// Traite une réponse SSDP brute.
    ///
    /// Retourne le device s'il est nouveau. Les réponses sans en-tête, sans
    /// `LOCATION` en `.xml` ou d'une adresse déjà connue sont ignorées.
    pub fn handle_response(&self, payload: &[u8]) -> Option<Arc<UpnpDevice>> {
        self.inner.handle_response(payload, None)
    }

    /// Premier résultat positif du prédicat sur les devices découverts.
    ///
    /// Lance la découverte si besoin. Le prédicat est évalué sur chaque
    /// device déjà connu puis sur chaque nouveau device, jusqu'à un résultat
    /// ou la fin de la découverte (`None` si aucun device ne convient).
    pub async fn get_first<T, F, Fut>(&self, predicate: F) -> Option<T>
    where
        F: Fn(Arc<UpnpDevice>) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let run = self.start();
        let mut subscription = self.subscribe();

        if run.is_completed() {
            while let Some(device) = subscription.try_recv() {
                if let Some(found) = predicate(device).await {
                    return Some(found);
                }
            }
            return None;
        }

        let mut pending = FuturesUnordered::new();
        let completion = run.wait();
        tokio::pin!(completion);

        loop {
            tokio::select! {
                Some(device) = subscription.recv() => {
                    pending.push(predicate(device));
                }
                Some(result) = pending.next(), if !pending.is_empty() => {
                    if result.is_some() {
                        return result;
                    }
                }
                _ = &mut completion => break,
            }
        }

        // Fin de la découverte : plus aucun device ne sera publié
        while let Some(device) = subscription.try_recv() {
            pending.push(predicate(device));
        }
        while let Some(result) = pending.next().await {
            if result.is_some() {
                return result;
            }
        }
        None
    }
}

struct DiscoverySocket {
    local: SocketAddr,
    socket: UdpSocket,
}

impl DiscovererInner {
    async fn run(self: Arc<Self>, timeout: Duration) -> DiscoveredDevices {
        let addresses = self.environment.local_ipv4_addresses();
        let sockets = open_sockets(&addresses);
        info!(
            "🔍 SSDP discovery started ({} sockets on {} addresses, timeout {:?})",
            sockets.len(),
            addresses.len(),
            timeout
        );

        let deadline = Instant::now() + timeout;

        let datagram = encode_search_datagram();
        let target = SocketAddr::from((SSDP_MULTICAST_ADDR, SSDP_PORT));
        for s in &sockets {
            match s.socket.send_to(&datagram, target).await {
                Ok(_) => info!("📤 M-SEARCH sent from {}", s.local),
                Err(e) => warn!("❌ Failed to send M-SEARCH from {}: {}", s.local, e),
            }
        }

        let mut buffer = vec![0u8; RECEIVE_BUFFER_SIZE];
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let mut received = false;
            for s in &sockets {
                match s.socket.try_recv_from(&mut buffer) {
                    Ok((len, from)) => {
                        received = true;
                        self.handle_response(&buffer[..len], Some(from));
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                    Err(e) => trace!("SSDP receive error on {}: {}", s.local, e),
                }
            }

            if received {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.options.idle_poll.min(deadline - now)).await;
            }
        }

        drop(sockets);

        let devices: DiscoveredDevices = Arc::new(self.registry.snapshot());
        *self.state.lock() = RunState::Completed(devices.clone());
        info!("✅ SSDP discovery completed: {} device(s)", devices.len());
        devices
    }

    fn handle_response(&self, payload: &[u8], from: Option<SocketAddr>) -> Option<Arc<UpnpDevice>> {
        let text = String::from_utf8_lossy(payload);
        let device = UpnpDevice::from_ssdp(&text);

        if device.is_empty() {
            trace!(from=?from, "Ignoring SSDP datagram without headers");
            return None;
        }
        if !device.has_description_location() {
            trace!(from=?from, location=?device.header("LOCATION"), "Ignoring SSDP response without XML location");
            return None;
        }

        let device = self.registry.insert(device)?;
        info!(
            "✅ Device found at {} ({})",
            device.registry_key(),
            device.server_name().unwrap_or("unknown server")
        );
        Some(device)
    }
}

/// Ouvre les sockets des adresses locales ; une adresse en échec est ignorée.
fn open_sockets(addresses: &[Ipv4Addr]) -> Vec<DiscoverySocket> {
    let mut sockets = Vec::new();
    for &addr in addresses {
        match open_socket_pair(addr) {
            Ok(pair) => {
                debug!("SSDP: sockets ready on {}", addr);
                sockets.extend(pair);
            }
            Err(e) => warn!("SSDP: cannot open sockets on {}: {}", addr, e),
        }
    }
    sockets
}

/// Socket unicast (port éphémère) et socket multicast (port 1900) liés à
/// `addr`.
fn open_socket_pair(addr: Ipv4Addr) -> io::Result<[DiscoverySocket; 2]> {
    let unicast = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    unicast.set_multicast_ttl_v4(SSDP_MULTICAST_TTL)?;
    unicast.set_nonblocking(true)?;
    unicast.bind(&SocketAddr::from((addr, 0)).into())?;

    let multicast = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    multicast.set_reuse_address(true)?;
    multicast.set_multicast_ttl_v4(SSDP_MULTICAST_TTL)?;
    multicast.set_nonblocking(true)?;
    multicast.bind(&SocketAddr::from((addr, SSDP_PORT)).into())?;
    multicast.join_multicast_v4(&SSDP_MULTICAST_ADDR, &addr)?;

    Ok([into_tokio(unicast)?, into_tokio(multicast)?])
}

fn into_tokio(socket: Socket) -> io::Result<DiscoverySocket> {
    let std_socket: std::net::UdpSocket = socket.into();
    let local = std_socket.local_addr()?;
    Ok(DiscoverySocket {
        local,
        socket: UdpSocket::from_std(std_socket)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Environnement sans interface réseau qui compte les découvertes.
    #[derive(Default)]
    struct CountingEnvironment {
        runs: AtomicUsize,
    }

    impl NetworkEnvironment for CountingEnvironment {
        fn local_ipv4_addresses(&self) -> Vec<Ipv4Addr> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        }

        fn lan_ip(&self) -> Ipv4Addr {
            Ipv4Addr::new(192, 168, 1, 10)
        }

        fn process_name(&self) -> Option<String> {
            None
        }
    }

    fn discoverer(timeout_ms: u64) -> (UpnpDiscoverer, Arc<CountingEnvironment>) {
        let environment = Arc::new(CountingEnvironment::default());
        let options = DiscoveryOptions {
            timeout: Duration::from_millis(timeout_ms),
            idle_poll: Duration::from_millis(5),
        };
        (UpnpDiscoverer::new(environment.clone(), options), environment)
    }

    fn response(n: u8, server: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 200 OK\r\nSERVER: {server}\r\nLOCATION: http://192.168.1.{n}:5000/rootDesc.xml\r\n\r\n"
        )
        .into_bytes()
    }

    /// Les tests sur le port 1900 ne tournent pas en parallèle.
    static SSDP_PORT_GUARD: once_cell::sync::Lazy<tokio::sync::Mutex<()>> =
        once_cell::sync::Lazy::new(|| tokio::sync::Mutex::new(()));

    /// Environnement limité à l'interface loopback.
    struct LoopbackEnvironment;

    impl NetworkEnvironment for LoopbackEnvironment {
        fn local_ipv4_addresses(&self) -> Vec<Ipv4Addr> {
            vec![Ipv4Addr::LOCALHOST]
        }

        fn lan_ip(&self) -> Ipv4Addr {
            Ipv4Addr::LOCALHOST
        }

        fn process_name(&self) -> Option<String> {
            None
        }
    }

    fn loopback_discoverer(timeout_ms: u64) -> UpnpDiscoverer {
        let options = DiscoveryOptions {
            timeout: Duration::from_millis(timeout_ms),
            idle_poll: Duration::from_millis(5),
        };
        UpnpDiscoverer::new(Arc::new(LoopbackEnvironment), options)
    }

    #[tokio::test]
    async fn socket_pair_binds_ephemeral_and_ssdp_ports() {
        let _guard = SSDP_PORT_GUARD.lock().await;
        let [unicast, multicast] = open_socket_pair(Ipv4Addr::LOCALHOST).unwrap();

        assert_eq!(unicast.local.ip(), Ipv4Addr::LOCALHOST);
        assert_ne!(unicast.local.port(), SSDP_PORT);
        assert_ne!(unicast.local.port(), 0);
        assert_eq!(multicast.local, SocketAddr::from((Ipv4Addr::LOCALHOST, SSDP_PORT)));
    }

    #[tokio::test]
    async fn loopback_run_receives_response() {
        let _guard = SSDP_PORT_GUARD.lock().await;
        let discoverer = loopback_discoverer(600);
        let started = std::time::Instant::now();
        let run = discoverer.start();

        // Laisse la tâche ouvrir ses sockets
        tokio::time::sleep(Duration::from_millis(100)).await;
        let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        sender
            .send_to(&response(9, "loopback"), (Ipv4Addr::LOCALHOST, SSDP_PORT))
            .await
            .unwrap();

        let devices = run.wait().await;

        assert!(discoverer.is_completed());
        assert!(started.elapsed() >= Duration::from_millis(600));
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].server_name(), Some("loopback"));
        assert_eq!(devices[0].registry_key(), "192.168.1.9:5000");
    }

    #[tokio::test]
    async fn busy_sockets_do_not_starve_waiters() {
        use std::sync::atomic::AtomicBool;

        let _guard = SSDP_PORT_GUARD.lock().await;

        let discoverer = loopback_discoverer(3_000);
        discoverer.handle_response(&response(1, "known"));
        let run = discoverer.start();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Flot continu de datagrammes sans LOCATION depuis un thread système
        let stop = Arc::new(AtomicBool::new(false));
        let flood_stop = stop.clone();
        let flood = std::thread::spawn(move || {
            let socket = std::net::UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
            let started = std::time::Instant::now();
            while !flood_stop.load(Ordering::SeqCst) && started.elapsed() < Duration::from_secs(2) {
                let _ = socket.send_to(
                    b"HTTP/1.1 200 OK\r\nST: noise\r\n\r\n",
                    (Ipv4Addr::LOCALHOST, SSDP_PORT),
                );
            }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = std::time::Instant::now();
        let found = discoverer
            .get_first(|device| async move { device.server_name().map(|s| s.to_string()) })
            .await;
        let waited = started.elapsed();

        stop.store(true, Ordering::SeqCst);
        flood.join().unwrap();

        assert_eq!(found.as_deref(), Some("known"));
        assert!(waited < Duration::from_secs(1), "waited {:?}", waited);
        assert!(!run.is_completed());
    }

    #[tokio::test]
    async fn first_caller_timeout_wins() {
        let (discoverer, environment) = discoverer(60_000);

        let started = std::time::Instant::now();
        discoverer.discover_with_timeout(Duration::from_millis(30)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(discoverer.is_completed());

        // Déjà terminée : la nouvelle durée est sans effet
        discoverer
            .discover_with_timeout(Duration::from_secs(120))
            .await;
        assert_eq!(environment.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_discover_runs_once() {
        let (discoverer, environment) = discoverer(50);

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let d = discoverer.clone();
            tasks.push(tokio::spawn(async move { d.discover().await }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(environment.runs.load(Ordering::SeqCst), 1);
        assert!(discoverer.is_completed());

        // Une découverte terminée n'est jamais relancée
        discoverer.discover().await;
        assert_eq!(environment.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_payload_is_ignored() {
        let (discoverer, _) = discoverer(50);
        let mut subscription = discoverer.subscribe();

        assert!(discoverer.handle_response(b"").is_none());
        assert!(discoverer.handle_response(b"no headers here").is_none());

        assert_eq!(discoverer.device_count(), 0);
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn non_xml_location_is_ignored() {
        let (discoverer, _) = discoverer(50);
        let payload = b"LOCATION: http://192.168.1.30:8008/ssdp/device-desc\r\nST: urn:dial-multiscreen-org:service:dial:1\r\n";

        assert!(discoverer.handle_response(payload).is_none());
        assert_eq!(discoverer.device_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_address_is_published_once() {
        let (discoverer, _) = discoverer(50);
        let mut subscription = discoverer.subscribe();

        assert!(discoverer.handle_response(&response(1, "a")).is_some());
        assert!(discoverer.handle_response(&response(1, "a-again")).is_none());

        assert_eq!(discoverer.device_count(), 1);
        assert!(subscription.try_recv().is_some());
        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn get_first_matches_known_device() {
        let (discoverer, _) = discoverer(2_000);
        discoverer.handle_response(&response(1, "a"));
        discoverer.handle_response(&response(2, "b"));

        let found = discoverer
            .get_first(|device| async move {
                (device.server_name() == Some("b")).then(|| device.registry_key())
            })
            .await;

        assert_eq!(found.as_deref(), Some("192.168.1.2:5000"));
        // Le résultat arrive avant la fin de la découverte
        assert!(!discoverer.is_completed());
    }

    #[tokio::test]
    async fn get_first_sees_device_found_during_run() {
        let (discoverer, _) = discoverer(2_000);

        let feeder = discoverer.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            feeder.handle_response(&response(7, "late"));
        });

        let found = discoverer
            .get_first(|device| async move {
                device.server_name().map(|s| s.to_string())
            })
            .await;

        assert_eq!(found.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn get_first_returns_none_after_completion() {
        let (discoverer, _) = discoverer(50);
        discoverer.handle_response(&response(1, "a"));

        let found = discoverer
            .get_first(|_device| async move { None::<()> })
            .await;

        assert!(found.is_none());
        assert!(discoverer.is_completed());
    }

    #[tokio::test]
    async fn get_first_on_completed_run() {
        let (discoverer, _) = discoverer(20);
        discoverer.discover().await;
        discoverer.handle_response(&response(3, "c"));

        let found = discoverer
            .get_first(|device| async move { device.server_name().map(|s| s.to_string()) })
            .await;
        assert_eq!(found.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn get_first_leaves_no_subscriber_behind() {
        let (discoverer, _) = discoverer(2_000);
        discoverer.handle_response(&response(1, "a"));

        let _ = discoverer
            .get_first(|device| async move { Some(device) })
            .await;

        assert_eq!(discoverer.inner.registry.subscriber_count(), 0);
    }
}
