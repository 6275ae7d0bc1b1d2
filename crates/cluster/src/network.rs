//! Network topologies built from a platform description.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use dslab_core::Simulation;
use dslab_network::models::{ConstantBandwidthNetworkModel, TopologyAwareNetworkModel};
use dslab_network::{Link, Network};

use crate::platform::{NetworkConfig, PlatformConfig};

const ROOT_SWITCH: &str = "switch::root";

fn rack_switch(rack: usize) -> String {
    format!("switch::rack_{}", rack)
}

/// Creates the network described by `platform` and registers it in the simulation as `net`.
///
/// Every platform host becomes a network node with the same name,
/// components are placed on it with [set_location](Network::set_location).
pub fn make_network(sim: &mut Simulation, platform: &PlatformConfig) -> Rc<RefCell<Network>> {
    let mut network = Network::new(Box::new(TopologyAwareNetworkModel::new()), sim.create_context("net"));

    match platform.network {
        NetworkConfig::Star {
            bandwidth,
            latency,
            internal_bandwidth,
        } => {
            network.add_node(
                ROOT_SWITCH,
                Box::new(ConstantBandwidthNetworkModel::new(internal_bandwidth, 0.)),
            );
            for host in platform.hosts.iter() {
                network.add_node(
                    &host.name,
                    Box::new(ConstantBandwidthNetworkModel::new(internal_bandwidth, 0.)),
                );
                network.add_link(&host.name, ROOT_SWITCH, Link::shared(bandwidth, latency));
            }
        }
        NetworkConfig::Tree {
            bandwidth,
            uplink_bandwidth,
            latency,
            internal_bandwidth,
        } => {
            network.add_node(
                ROOT_SWITCH,
                Box::new(ConstantBandwidthNetworkModel::new(internal_bandwidth, 0.)),
            );
            let racks = platform.hosts.iter().map(|host| host.rack).collect::<BTreeSet<_>>();
            for &rack in racks.iter() {
                let switch_name = rack_switch(rack);
                network.add_node(
                    &switch_name,
                    Box::new(ConstantBandwidthNetworkModel::new(internal_bandwidth, 0.)),
                );
                network.add_link(ROOT_SWITCH, &switch_name, Link::shared(uplink_bandwidth, latency));
            }
            for host in platform.hosts.iter() {
                network.add_node(
                    &host.name,
                    Box::new(ConstantBandwidthNetworkModel::new(internal_bandwidth, 0.)),
                );
                network.add_link(&host.name, &rack_switch(host.rack), Link::shared(bandwidth, latency));
            }
        }
    }

    network.init_topology();
    let network_rc = Rc::new(RefCell::new(network));
    sim.add_handler("net", network_rc.clone());
    network_rc
}
