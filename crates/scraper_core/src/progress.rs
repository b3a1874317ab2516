/// Trait for reporting progress while the feed is assembled
pub trait ProgressHandler: Send + Sync {
    /// Set the number of journey queries the run will make
    fn set_total_queries(&self, count: usize);

    /// Called before querying the planner for a route and service
    fn on_start_query(&self, route_id: &str, service_id: &str);

    /// Called once the query's trips have been collected
    fn on_finish_query(&self, route_id: &str, service_id: &str, trips: usize);
}

/// A no-op progress handler
pub struct NoOpProgressHandler;

impl ProgressHandler for NoOpProgressHandler {
    fn set_total_queries(&self, _count: usize) {}
    fn on_start_query(&self, _route_id: &str, _service_id: &str) {}
    fn on_finish_query(&self, _route_id: &str, _service_id: &str, _trips: usize) {}
}
