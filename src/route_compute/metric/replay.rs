use super::{evaluate, Direction, Hop, PathMetric, Visibility};
use crate::error::{RoutingError, Result};
use crate::model::{EdgeId, Network, NodeId, Path, Request};

/// Re-evaluates `edges` from `source` one hop at a time, exactly as a
/// forward search would, and returns the resulting path.
pub fn replay<M: PathMetric + ?Sized>(
    network: &Network,
    metric: &M,
    request: &Request,
    source: NodeId,
    edges: &[EdgeId],
) -> Result<Path> {
    if !network.contains(source) {
        return Err(RoutingError::UnknownNode(source));
    }

    let mut path = Path::empty(source);
    path.constraints = vec![0.0; metric.number_of_constraints()];

    for (idx, edge) in edges.iter().enumerate() {
        if edge.index() >= network.edge_count() {
            return Err(RoutingError::Configuration(format!(
                "edge {edge} is not part of the network"
            )));
        }
        let link = network.edge(*edge);
        if link.from != path.destination {
            return Err(RoutingError::Configuration(format!(
                "edge {edge} does not continue the path at {}",
                path.destination
            )));
        }

        let history: &[EdgeId] = match metric.visibility() {
            Visibility::EdgeOnly => &[],
            Visibility::PreviousEdge => &edges[idx.saturating_sub(1)..idx],
            Visibility::FullPath => &edges[..idx],
        };
        let hop = Hop {
            network,
            request,
            direction: Direction::Forward,
            edge: *edge,
            parameters: &path.parameters,
        };
        let step =
            evaluate(metric, &hop, history)?.ok_or(RoutingError::AccessDenied { edge: *edge })?;

        path.cost += step.cost;
        for (acc, value) in path.constraints.iter_mut().zip(&step.constraints) {
            *acc += *value;
        }
        path.parameters = step.parameters;
        path.edges.push(*edge);
        path.destination = link.to;
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinkMetrics, QosBounds};
    use crate::route_compute::metric::{DelayConstrainedMetric, EdgeOnly};

    fn mm(weight: f64, delay: f64, bw: f64) -> LinkMetrics {
        LinkMetrics {
            weight,
            bandwidth: bw,
            delay,
            loss: 0.0,
            utilization: 0.0,
        }
    }

    #[test]
    fn replay_accumulates_costs_constraints_and_parameters() {
        let mut network = Network::new();
        let a = network.add_node("a");
        let b = network.add_node("b");
        let c = network.add_node("c");
        let ab = network.add_edge(a, b, mm(2.0, 3.0, 100.0));
        let bc = network.add_edge(b, c, mm(5.0, 4.0, 40.0));
        let metric = EdgeOnly(DelayConstrainedMetric::new());
        let request = Request::unicast(a, c);

        let path = replay(&network, &metric, &request, a, &[ab, bc]).unwrap();
        assert_eq!(path.destination, c);
        assert_eq!(path.cost, 7.0);
        assert_eq!(path.constraints, vec![7.0, 0.0]);
        assert_eq!(path.parameters, vec![7.0, 40.0]);

        let empty = replay(&network, &metric, &request, a, &[]).unwrap();
        assert_eq!(empty, {
            let mut p = Path::empty(a);
            p.constraints = vec![0.0, 0.0];
            p
        });
    }

    #[test]
    fn replay_reports_denied_and_disconnected_edges() {
        let mut network = Network::new();
        let a = network.add_node("a");
        let b = network.add_node("b");
        let c = network.add_node("c");
        let ab = network.add_edge(a, b, mm(2.0, 3.0, 100.0));
        let bc = network.add_edge(b, c, mm(5.0, 4.0, 40.0));
        let metric = EdgeOnly(DelayConstrainedMetric::new());
        let request = Request::unicast(a, c).with_qos(QosBounds {
            max_delay: Some(5.0),
            ..Default::default()
        });

        assert_eq!(
            replay(&network, &metric, &request, a, &[ab, bc]),
            Err(RoutingError::AccessDenied { edge: bc })
        );
        assert!(matches!(
            replay(&network, &metric, &request, b, &[ab]),
            Err(RoutingError::Configuration(_))
        ));
    }
}
