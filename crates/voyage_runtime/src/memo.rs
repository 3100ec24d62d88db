//! Route memo shared by every session in the process.
//!
//! Best-effort: two sessions asking for the same pair at once may both call
//! the route service, and the later insert wins.

use std::collections::HashMap;

use parking_lot::Mutex;
use voyage_core::{PortCode, RouteData};

#[derive(Default)]
pub struct RouteMemo {
    routes: Mutex<HashMap<(PortCode, PortCode), RouteData>>,
}

impl RouteMemo {
    pub fn get(&self, origin: &PortCode, destination: &PortCode) -> Option<RouteData> {
        self.routes
            .lock()
            .get(&(origin.clone(), destination.clone()))
            .cloned()
    }

    pub fn insert(&self, route: &RouteData) {
        self.routes.lock().insert(
            (route.origin.clone(), route.destination.clone()),
            route.clone(),
        );
    }

    pub fn len(&self) -> usize {
        self.routes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voyage_core::test_fixtures::sgsin_aefjr_route;

    #[test]
    fn test_memo_is_keyed_by_direction() {
        let memo = RouteMemo::default();
        let route = sgsin_aefjr_route();
        memo.insert(&route);
        assert_eq!(memo.get(&route.origin, &route.destination), Some(route.clone()));
        assert!(memo.get(&route.destination, &route.origin).is_none());
        memo.insert(&route);
        assert_eq!(memo.len(), 1);
    }
}
