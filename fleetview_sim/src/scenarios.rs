//! Chaos engineering scenarios for DST.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// DST-001: One driver travels a full route and parks at the destination
    SingleTrip,

    /// DST-002: Start-tracking again mid-route rebases the driver
    RestartMidRoute,

    /// DST-003: Interleaved start/stop bursts for the same driver
    StopRace,

    /// DST-004: Routing engine unreachable, sessions must stay untouched
    RoutingOutage,

    /// DST-005: Routing engine answers with no route
    EmptyRoute,

    /// DST-006: Clients connect, track and vanish at random
    DisconnectStorm,

    /// DST-007: Many drivers ticking side by side with a flaky router
    Fleet,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SingleTrip,
            ScenarioId::RestartMidRoute,
            ScenarioId::StopRace,
            ScenarioId::RoutingOutage,
            ScenarioId::EmptyRoute,
            ScenarioId::DisconnectStorm,
            ScenarioId::Fleet,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SingleTrip => "single_trip",
            ScenarioId::RestartMidRoute => "restart_mid_route",
            ScenarioId::StopRace => "stop_race",
            ScenarioId::RoutingOutage => "routing_outage",
            ScenarioId::EmptyRoute => "empty_route",
            ScenarioId::DisconnectStorm => "disconnect_storm",
            ScenarioId::Fleet => "fleet",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SingleTrip => "One driver, one route: every waypoint broadcast in order, then parked",
            ScenarioId::RestartMidRoute => "Restart halfway: position rebased, one ticker, new path only",
            ScenarioId::StopRace => "Concurrent start/stop bursts: registry and ticker count agree",
            ScenarioId::RoutingOutage => "Router down: starts fail, live sessions keep their route",
            ScenarioId::EmptyRoute => "Router returns nothing: start fails, session stays idle",
            ScenarioId::DisconnectStorm => "Random client disconnects: every bound driver torn down",
            ScenarioId::Fleet => "N drivers with a 30% flaky router: isolation and steady ticking",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single_trip" | "singletrip" | "dst-001" => Ok(ScenarioId::SingleTrip),
            "restart_mid_route" | "restart" | "dst-002" => Ok(ScenarioId::RestartMidRoute),
            "stop_race" | "stoprace" | "dst-003" => Ok(ScenarioId::StopRace),
            "routing_outage" | "outage" | "dst-004" => Ok(ScenarioId::RoutingOutage),
            "empty_route" | "emptyroute" | "dst-005" => Ok(ScenarioId::EmptyRoute),
            "disconnect_storm" | "disconnectstorm" | "dst-006" => Ok(ScenarioId::DisconnectStorm),
            "fleet" | "dst-007" => Ok(ScenarioId::Fleet),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
