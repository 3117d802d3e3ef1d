#[cfg(test)]
mod tests {
    use crate::config::NetworkConfig;
    use crate::network::{
        watch, ConvergenceWatcher, Network, NetworkError, NetworkEvent, NetworkStatus, Packet,
    };
    use crate::vm::{CancellationToken, VMError};

    /// Node 0 sends (3, 4) to the NAT on boot; every node echoes any packet it
    /// receives back to the NAT.
    const ECHO_TO_NAT: [i64; 32] = [
        3, 100, 1005, 100, 11, 104, 255, 104, 3, 104, 4, 3, 101, 1008, 101, -1, 103, 1005, 103,
        11, 3, 102, 104, 255, 4, 101, 4, 102, 1105, 1, 11, 99,
    ];

    /// Node 0 sends (5, 2) to its peer; each node passes packets to its peer
    /// with y decremented, and reports to the NAT once y reaches 0.
    const PING_PONG: [i64; 59] = [
        3, 100, 1002, 100, -1, 104, 1001, 104, 1, 104, 1005, 100, 22, 4, 104, 104, 5, 104, 2,
        1105, 1, 22, 3, 101, 1008, 101, -1, 103, 1005, 103, 22, 3, 102, 1006, 102, 50, 101, -1,
        102, 102, 4, 104, 4, 101, 4, 102, 1105, 1, 22, 99, 104, 255, 4, 101, 104, 0, 1105, 1, 22,
    ];

    fn two_nodes() -> NetworkConfig {
        NetworkConfig {
            size: 2,
            ..NetworkConfig::default()
        }
    }

    fn nat_forward(x: i64, y: i64) -> NetworkEvent {
        NetworkEvent::PacketTransmitted {
            sender: 255,
            packet: Packet::new(0, x, y),
        }
    }

    #[test]
    fn test_idle_tick_triggers_nat_forward() {
        let mut network = Network::new(&ECHO_TO_NAT, two_nodes()).unwrap();

        let events = network.tick().unwrap();
        assert!(network.at_idle());
        assert_eq!(
            events,
            vec![
                NetworkEvent::PacketTransmitted {
                    sender: 0,
                    packet: Packet::new(255, 3, 4),
                },
                nat_forward(3, 4),
            ]
        );
        assert_eq!(network.computer(0).unwrap().queued(), 1);
        assert_eq!(network.nat().forwarded(), 1);
    }

    #[test]
    fn test_consumed_packet_keeps_network_busy() {
        let mut network = Network::new(&ECHO_TO_NAT, two_nodes()).unwrap();
        network.tick().unwrap();

        // Computer 0 is handed the forwarded packet: not idle, no second forward
        let events = network.tick().unwrap();
        assert!(!network.at_idle());
        assert!(events.is_empty());
        assert_eq!(network.nat().forwarded(), 1);

        // It echoes the packet back to the NAT, after which everyone is idle again
        let events = network.tick().unwrap();
        assert!(network.at_idle());
        assert_eq!(events.last(), Some(&nat_forward(3, 4)));
        assert_eq!(network.nat().forwarded(), 2);
        assert_eq!(network.ticks(), 3);
    }

    #[test]
    fn test_peer_traffic_then_nat_idle_break() {
        let mut network = Network::new(&PING_PONG, two_nodes()).unwrap();

        for tick in 1..=4 {
            let events = network.tick().unwrap();
            assert!(!network.at_idle(), "tick {} should not be idle", tick);
            assert!(events.iter().all(|e| !matches!(
                e,
                NetworkEvent::PacketTransmitted { sender: 255, .. }
            )));
        }

        let events = network.tick().unwrap();
        assert!(network.at_idle());
        assert_eq!(
            events,
            vec![
                NetworkEvent::PacketTransmitted {
                    sender: 1,
                    packet: Packet::new(255, 5, 0),
                },
                nat_forward(5, 0),
            ]
        );
    }

    #[test]
    fn test_peer_packets_are_routed_between_nodes() {
        let mut network = Network::new(&PING_PONG, two_nodes()).unwrap();

        let events = network.tick().unwrap();
        assert_eq!(
            events,
            vec![NetworkEvent::PacketTransmitted {
                sender: 0,
                packet: Packet::new(1, 5, 2),
            }]
        );

        let events = network.tick().unwrap();
        assert_eq!(
            events,
            vec![NetworkEvent::PacketTransmitted {
                sender: 1,
                packet: Packet::new(0, 5, 1),
            }]
        );
        assert_eq!(network.computer(0).unwrap().queued(), 1);
    }

    #[test]
    fn test_unknown_recipient_is_dropped() {
        let program = [104, 77, 104, 1, 104, 2, 3, 50, 1105, 1, 6];
        let mut network = Network::new(&program, two_nodes()).unwrap();

        let events = network.tick().unwrap();
        assert_eq!(events.len(), 2);
        assert!(network.at_idle());
        assert!(!network.nat().has_been_written());
        assert_eq!(network.computer(1).unwrap().queued(), 0);
    }

    #[test]
    fn test_packets_to_halted_computer_are_dropped() {
        // Node 0 sends (1, 5, 6) every time it reads input; other nodes halt
        let program = [
            3, 100, 1005, 100, 16, 3, 101, 104, 1, 104, 5, 104, 6, 1105, 1, 5, 99,
        ];
        let mut network = Network::new(&program, two_nodes()).unwrap();

        let events = network.tick().unwrap();
        assert_eq!(events, vec![NetworkEvent::ComputerHalted { id: 1 }]);

        let events = network.tick().unwrap();
        assert_eq!(
            events,
            vec![NetworkEvent::PacketTransmitted {
                sender: 0,
                packet: Packet::new(1, 5, 6),
            }]
        );
        assert!(network.at_idle());
        assert_eq!(network.computer(1).unwrap().queued(), 0);
        assert!(!network.enqueue_packet(Packet::new(1, 7, 8)));
        assert_eq!(network.computer(1).unwrap().queued(), 0);
    }

    #[test]
    fn test_vm_failure_names_computer() {
        let mut network = Network::new(&[3, 0, 42], two_nodes()).unwrap();
        match network.tick() {
            Err(NetworkError::Vm { id, source }) => {
                assert_eq!(id, 0);
                assert_eq!(source, VMError::UnknownOpcode { opcode: 42, address: 2 });
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = NetworkConfig {
            size: 300,
            ..NetworkConfig::default()
        };
        assert!(matches!(
            Network::new(&ECHO_TO_NAT, config),
            Err(NetworkError::Config(_))
        ));
    }

    #[test]
    fn test_external_enqueue() {
        let mut network = Network::new(&ECHO_TO_NAT, two_nodes()).unwrap();
        assert!(network.enqueue_packet(Packet::new(1, 8, 9)));
        assert!(!network.enqueue_packet(Packet::new(7, 8, 9)));
        assert_eq!(network.computer(1).unwrap().queued(), 1);
        assert!(network.computer(2).is_none());
    }

    #[tokio::test]
    async fn test_run_until_converged() {
        let mut network = Network::new(&ECHO_TO_NAT, two_nodes()).unwrap();
        let token = CancellationToken::new();
        let (sender, receiver) = futures::channel::mpsc::unbounded();

        let (status, watcher) = tokio::join!(
            network.run_async(&token, sender),
            watch(receiver, ConvergenceWatcher::new(255), token.clone())
        );

        assert_eq!(status.unwrap(), NetworkStatus::Cancelled);
        assert_eq!(watcher.converged(), Some(4));
        assert_eq!(watcher.first_nat_packet(), Some(Packet::new(255, 3, 4)));
    }

    #[tokio::test]
    async fn test_run_stops_when_all_halted() {
        let mut network = Network::new(&[3, 0, 99], two_nodes()).unwrap();
        let token = CancellationToken::new();
        let (sender, mut receiver) = futures::channel::mpsc::unbounded();

        let status = network.run_async(&token, sender).await.unwrap();
        assert_eq!(status, NetworkStatus::Halted);

        let mut halted = Vec::new();
        while let Ok(Some(event)) = receiver.try_next() {
            halted.push(event);
        }
        assert_eq!(
            halted,
            vec![
                NetworkEvent::ComputerHalted { id: 0 },
                NetworkEvent::ComputerHalted { id: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_does_nothing() {
        let mut network = Network::new(&ECHO_TO_NAT, two_nodes()).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let (sender, _receiver) = futures::channel::mpsc::unbounded();

        let status = network.run_async(&token, sender).await.unwrap();
        assert_eq!(status, NetworkStatus::Cancelled);
        assert_eq!(network.ticks(), 0);
    }
}
