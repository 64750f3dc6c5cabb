//! Domain error types.
//!
//! Validation failures in journey assembly, distinct from loader and query
//! errors.

#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    /// Journey has no legs
    #[error("journey must have at least one leg")]
    EmptyJourney,

    /// Consecutive legs don't share a stop
    #[error("legs do not connect: leg ends at stop {0} but next starts at stop {1}")]
    LegsNotContiguous(u32, u32),

    /// A leg arrives before it departs within the same service day
    #[error("leg times not monotone: departs {0} but arrives {1}")]
    TimeNotMonotone(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            DomainError::EmptyJourney.to_string(),
            "journey must have at least one leg"
        );
        assert_eq!(
            DomainError::LegsNotContiguous(3, 7).to_string(),
            "legs do not connect: leg ends at stop 3 but next starts at stop 7"
        );
    }
}
