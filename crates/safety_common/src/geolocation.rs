//! Geolocation resolver.
//!
//! Permission-checked, timeout-bounded retrieval of the device position,
//! with fallback to the cached last-known fix. The live fetch races a
//! timer; losing the race abandons the fetch, it is never blocked on.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::SafetyError;
use crate::location::LocationFix;
use crate::permissions::PermissionState;

/// Outcome of racing a future against a timer
#[derive(Debug)]
pub enum RaceOutcome<T> {
    Completed(T),
    TimedOut,
}

/// First-settled-wins: the future's result, or `TimedOut` once the timer
/// fires. The losing future is dropped, not awaited.
pub async fn race_with_timeout<F, T>(fut: F, duration: Duration) -> RaceOutcome<T>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(value) => RaceOutcome::Completed(value),
        Err(_) => RaceOutcome::TimedOut,
    }
}

/// Source of live position fixes
#[derive(Debug, Clone)]
pub enum LocationProvider {
    /// Run a helper command that prints `lat lng [accuracy]` on stdout
    Command { program: String, args: Vec<String> },
    /// Always return the same fix (demos and tests)
    Fixed(LocationFix),
    /// No positioning facility on this host
    Unavailable,
}

impl LocationProvider {
    /// Build from a configured helper command line, if any
    pub fn from_command_line(command: Option<&str>) -> Self {
        match command {
            Some(line) => {
                let mut parts = line.split_whitespace();
                match parts.next() {
                    Some(program) => LocationProvider::Command {
                        program: program.to_string(),
                        args: parts.map(str::to_string).collect(),
                    },
                    None => LocationProvider::Unavailable,
                }
            }
            None => LocationProvider::Unavailable,
        }
    }

    /// Request one position fix from the underlying facility
    pub async fn fetch(&self) -> Result<LocationFix, SafetyError> {
        match self {
            LocationProvider::Command { program, args } => {
                let output = tokio::process::Command::new(program)
                    .args(args)
                    .kill_on_drop(true)
                    .output()
                    .await
                    .map_err(|e| {
                        SafetyError::Provider(format!("failed to run {}: {}", program, e))
                    })?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(SafetyError::Provider(format!(
                        "{} exited with {}: {}",
                        program,
                        output.status,
                        stderr.trim()
                    )));
                }

                let stdout = String::from_utf8_lossy(&output.stdout);
                parse_fix(&stdout)
            }
            LocationProvider::Fixed(fix) => Ok(fix.clone()),
            LocationProvider::Unavailable => Err(SafetyError::Provider(
                "no location provider configured".to_string(),
            )),
        }
    }
}

/// Parse `lat lng [accuracy]` from helper output
fn parse_fix(stdout: &str) -> Result<LocationFix, SafetyError> {
    let line = stdout
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| SafetyError::Provider("empty provider output".to_string()))?;

    let mut parts = line.split_whitespace();
    let lat: f64 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| SafetyError::Provider(format!("bad latitude in '{}'", line)))?;
    let lng: f64 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| SafetyError::Provider(format!("bad longitude in '{}'", line)))?;
    let accuracy: Option<f64> = parts.next().and_then(|s| s.parse().ok());

    Ok(LocationFix::new(lat, lng, accuracy))
}

/// Permission-gated resolver with a last-known cache
pub struct GeoResolver {
    provider: LocationProvider,
    permission: PermissionState,
    last_known: Option<LocationFix>,
}

impl GeoResolver {
    pub fn new(provider: LocationProvider, permission: PermissionState) -> Self {
        Self {
            provider,
            permission,
            last_known: None,
        }
    }

    /// Update the cached permission grant
    pub fn set_permission(&mut self, permission: PermissionState) {
        self.permission = permission;
    }

    pub fn set_provider(&mut self, provider: LocationProvider) {
        self.provider = provider;
    }

    /// Fetch a live fix, bounded by `timeout`.
    ///
    /// Fails immediately when the cached location permission is not
    /// granted; no fetch is attempted in that case.
    pub async fn current_location(
        &mut self,
        timeout: Duration,
    ) -> Result<LocationFix, SafetyError> {
        if !self.permission.is_granted() {
            return Err(SafetyError::PermissionDenied("Location"));
        }

        match race_with_timeout(self.provider.fetch(), timeout).await {
            RaceOutcome::Completed(Ok(fix)) => {
                debug!(
                    "Resolved position {:.5},{:.5} (accuracy {:?})",
                    fix.lat, fix.lng, fix.accuracy
                );
                self.last_known = Some(fix.clone());
                Ok(fix)
            }
            RaceOutcome::Completed(Err(e)) => {
                warn!("Location fetch failed: {}", e);
                Err(e)
            }
            RaceOutcome::TimedOut => {
                warn!("Location fetch abandoned after {:?}", timeout);
                Err(SafetyError::Timeout("Location"))
            }
        }
    }

    /// Most recent cached fix, without a live fetch
    pub fn last_known_location(&self) -> Result<LocationFix, SafetyError> {
        if !self.permission.is_granted() {
            return Err(SafetyError::PermissionDenied("Location"));
        }
        self.last_known.clone().ok_or(SafetyError::NoLastKnown)
    }

    /// Live fix, falling back to the last-known cache. When both fail the
    /// ORIGINAL failure is propagated, not the fallback's, so callers see
    /// the more informative error.
    pub async fn location_with_fallback(
        &mut self,
        timeout: Duration,
    ) -> Result<LocationFix, SafetyError> {
        match self.current_location(timeout).await {
            Ok(fix) => Ok(fix),
            Err(original) => match self.last_known_location() {
                Ok(fix) => {
                    debug!("Using last known location after: {}", original);
                    Ok(fix)
                }
                Err(_) => Err(original),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix() -> LocationFix {
        LocationFix::new(40.7128, -74.006, Some(10.0))
    }

    #[tokio::test]
    async fn test_permission_denied_short_circuits() {
        let mut resolver = GeoResolver::new(
            LocationProvider::Fixed(fix()),
            PermissionState::Denied,
        );
        let err = resolver
            .current_location(Duration::from_millis(100))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Location permission not granted");

        // Undetermined is not granted either
        resolver.set_permission(PermissionState::Undetermined);
        assert!(resolver
            .current_location(Duration::from_millis(100))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_success_seeds_last_known() {
        let mut resolver =
            GeoResolver::new(LocationProvider::Fixed(fix()), PermissionState::Granted);
        assert!(matches!(
            resolver.last_known_location(),
            Err(SafetyError::NoLastKnown)
        ));

        let got = resolver
            .current_location(Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(got.lat, 40.7128);
        assert!(resolver.last_known_location().is_ok());
    }

    #[tokio::test]
    async fn test_timeout_wins_race() {
        let mut resolver = GeoResolver::new(
            LocationProvider::Command {
                program: "sleep".to_string(),
                args: vec!["5".to_string()],
            },
            PermissionState::Granted,
        );

        let err = resolver
            .current_location(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Location request timed out");
    }

    #[tokio::test]
    async fn test_fallback_uses_cache() {
        let mut resolver =
            GeoResolver::new(LocationProvider::Fixed(fix()), PermissionState::Granted);
        resolver
            .current_location(Duration::from_millis(100))
            .await
            .unwrap();

        // Live fetches now fail, cache still answers
        resolver.set_provider(LocationProvider::Unavailable);
        let got = resolver
            .location_with_fallback(Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(got.lat, 40.7128);
    }

    #[tokio::test]
    async fn test_fallback_propagates_original_error() {
        let mut resolver =
            GeoResolver::new(LocationProvider::Unavailable, PermissionState::Granted);

        // No cache: the provider failure must surface, not NoLastKnown
        let err = resolver
            .location_with_fallback(Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, SafetyError::Provider(_)));
    }

    #[test]
    fn test_parse_fix() {
        let fix = parse_fix("40.7128 -74.0060 12.5\n").unwrap();
        assert_eq!(fix.lat, 40.7128);
        assert_eq!(fix.lng, -74.006);
        assert_eq!(fix.accuracy, Some(12.5));

        let fix = parse_fix("\n51.5 -0.12\n").unwrap();
        assert_eq!(fix.accuracy, None);

        assert!(parse_fix("").is_err());
        assert!(parse_fix("north somewhere").is_err());
    }

    #[test]
    fn test_provider_from_command_line() {
        let provider = LocationProvider::from_command_line(Some("where-am-i --format plain"));
        match provider {
            LocationProvider::Command { program, args } => {
                assert_eq!(program, "where-am-i");
                assert_eq!(args, vec!["--format", "plain"]);
            }
            other => panic!("unexpected provider {:?}", other),
        }

        assert!(matches!(
            LocationProvider::from_command_line(None),
            LocationProvider::Unavailable
        ));
    }
}
