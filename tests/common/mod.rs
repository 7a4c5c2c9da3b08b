use keepalived_checker::vip::{DetectError, InterfaceAddr, InterfaceSource, NetInterface};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Interface source whose answer can be changed between calls.
pub struct FakeInterfaces {
    state: Mutex<Option<Vec<NetInterface>>>,
    calls: AtomicUsize,
}

impl FakeInterfaces {
    pub fn new(interfaces: Vec<NetInterface>) -> Self {
        Self {
            state: Mutex::new(Some(interfaces)),
            calls: AtomicUsize::new(0),
        }
    }

    /// A source whose enumeration always fails.
    #[allow(dead_code)]
    pub fn failing() -> Self {
        Self {
            state: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn set(&self, interfaces: Vec<NetInterface>) {
        *self.state.lock().unwrap() = Some(interfaces);
    }

    #[allow(dead_code)]
    pub fn fail(&self) {
        *self.state.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InterfaceSource for FakeInterfaces {
    fn interfaces(&self) -> Result<Vec<NetInterface>, DetectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.state.lock().unwrap() {
            Some(interfaces) => Ok(interfaces.clone()),
            None => Err(DetectError::Enumerate(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "getifaddrs failed",
            ))),
        }
    }
}

pub fn net(cidr: &str) -> InterfaceAddr {
    let (ip, prefix_len) = cidr.split_once('/').unwrap();
    InterfaceAddr::Net {
        ip: ip.parse().unwrap(),
        prefix_len: prefix_len.parse().unwrap(),
    }
}

#[allow(dead_code)]
pub fn bare(ip: &str) -> InterfaceAddr {
    InterfaceAddr::Bare(ip.parse().unwrap())
}

pub fn iface(name: &str, up: bool, loopback: bool, addrs: Vec<InterfaceAddr>) -> NetInterface {
    NetInterface {
        name: name.to_string(),
        up,
        loopback,
        addrs,
    }
}

/// `eth0`, up, carrying 10.0.0.5/24.
pub fn eth0() -> Vec<NetInterface> {
    vec![iface("eth0", true, false, vec![net("10.0.0.5/24")])]
}
