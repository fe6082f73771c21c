mod arbitrary;
mod different_hosts;
mod multi_host;
mod proximity;
mod single_host;

pub use arbitrary::ArbitraryStrategy;
pub use different_hosts::DifferentHostsExclusiveStrategy;
pub use multi_host::MultipleHostsExclusiveStrategy;
pub use proximity::ProximityStrategy;
pub use single_host::SingleHostStrategy;

#[cfg(test)]
pub(crate) mod fixtures {
    //! The three-host cluster used throughout the strategy tests:
    //! `current` (6 free), `neighbor` (1 free), `distant` (2 free), with
    //! `neighbor` closer to `current` than `distant` is.

    use gridalloc_topology::Topology;

    pub fn three_hosts() -> Topology {
        let mut t = Topology::new();
        for (host, count) in [("current", 6), ("neighbor", 1), ("distant", 2)] {
            t.register_host(host).unwrap();
            for i in 0..count {
                t.register_node(&format!("node://{host}/{i}"), host).unwrap();
            }
        }
        t.set_distance("current", "neighbor", 10).unwrap();
        t.set_distance("current", "distant", 100).unwrap();
        t.set_distance("neighbor", "distant", 90).unwrap();
        t
    }

    pub fn host_of(node: &str) -> &str {
        node.trim_start_matches("node://")
            .split('/')
            .next()
            .unwrap_or_default()
    }

    pub fn count_on(nodes: &[String], host: &str) -> usize {
        nodes.iter().filter(|n| host_of(n) == host).count()
    }
}
