use super::FlowKey;
use std::{collections::HashSet, fmt, net::Ipv4Addr};

/// What a flow is considered to be for reporting purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowClass {
    /// traffic whose quality of service is being measured
    Legitimate,
    /// flood traffic
    Attack,
    /// anything else, excluded from the report
    Unclassified,
}

/// Decides the [`FlowClass`] of a flow the first time it is observed.
///
/// The decision is taken once per flow and never revised. Any closure
/// `Fn(&FlowKey) -> FlowClass` is a classifier.
///
/// ```
/// use floodsim_core::flow::{FlowClass, FlowClassifier, FlowKey};
///
/// let everything_is_legitimate = |_: &FlowKey| FlowClass::Legitimate;
/// # let key = FlowKey::udp("10.1.1.1:49153".parse().unwrap(), "10.3.0.2:4000".parse().unwrap());
/// # assert_eq!(everything_is_legitimate.classify(&key), FlowClass::Legitimate);
/// ```
pub trait FlowClassifier {
    fn classify(&self, key: &FlowKey) -> FlowClass;
}

impl<F> FlowClassifier for F
where
    F: Fn(&FlowKey) -> FlowClass,
{
    fn classify(&self, key: &FlowKey) -> FlowClass {
        self(key)
    }
}

/// The classification used by the game scenario.
///
/// A flow is legitimate iff it goes from one of the client addresses to
/// the server address, on any port. Flows from an attacker address are
/// attacks, anything else (including server replies) is unclassified.
#[derive(Debug, Clone, Default)]
pub struct ClientServerClassifier {
    clients: HashSet<Ipv4Addr>,
    attackers: HashSet<Ipv4Addr>,
    server: Option<Ipv4Addr>,
}

impl ClientServerClassifier {
    pub fn new(server: Ipv4Addr) -> Self {
        Self {
            server: Some(server),
            ..Self::default()
        }
    }

    pub fn with_client(mut self, address: Ipv4Addr) -> Self {
        self.clients.insert(address);
        self
    }

    pub fn with_attacker(mut self, address: Ipv4Addr) -> Self {
        self.attackers.insert(address);
        self
    }

    pub fn with_clients(mut self, addresses: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        self.clients.extend(addresses);
        self
    }

    pub fn with_attackers(mut self, addresses: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        self.attackers.extend(addresses);
        self
    }
}

impl FlowClassifier for ClientServerClassifier {
    fn classify(&self, key: &FlowKey) -> FlowClass {
        let src = *key.src.ip();
        let dst = *key.dst.ip();

        if self.clients.contains(&src) && Some(dst) == self.server {
            FlowClass::Legitimate
        } else if self.attackers.contains(&src) {
            FlowClass::Attack
        } else {
            FlowClass::Unclassified
        }
    }
}

impl fmt::Display for FlowClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legitimate => f.write_str("legitimate"),
            Self::Attack => f.write_str("attack"),
            Self::Unclassified => f.write_str("unclassified"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(src: &str, dst: &str) -> FlowKey {
        FlowKey::udp(src.parse().unwrap(), dst.parse().unwrap())
    }

    #[test]
    fn client_server() {
        let classifier = ClientServerClassifier::new(Ipv4Addr::new(10, 3, 0, 2))
            .with_client(Ipv4Addr::new(10, 1, 1, 1))
            .with_attacker(Ipv4Addr::new(10, 2, 1, 1));

        assert_eq!(
            classifier.classify(&key("10.1.1.1:49153", "10.3.0.2:4000")),
            FlowClass::Legitimate
        );
        assert_eq!(
            classifier.classify(&key("10.2.1.1:49153", "10.3.0.2:4000")),
            FlowClass::Attack
        );
        // the reverse direction is not what is measured
        assert_eq!(
            classifier.classify(&key("10.3.0.2:4000", "10.1.1.1:49153")),
            FlowClass::Unclassified
        );
        // a client talking to someone else
        assert_eq!(
            classifier.classify(&key("10.1.1.1:49153", "10.3.0.1:4000")),
            FlowClass::Unclassified
        );
    }

    #[test]
    fn closure() {
        let classifier = |key: &FlowKey| {
            if key.dst.port() == 4000 {
                FlowClass::Legitimate
            } else {
                FlowClass::Unclassified
            }
        };

        assert_eq!(
            classifier.classify(&key("1.1.1.1:1", "2.2.2.2:4000")),
            FlowClass::Legitimate
        );
        assert_eq!(
            classifier.classify(&key("1.1.1.1:1", "2.2.2.2:53")),
            FlowClass::Unclassified
        );
    }
}
