//! Producers of candidate rounds.

use anyhow::Result;

use crate::observation::RoundCandidate;

/// Something that hands out candidate rounds until the operator ends the
/// session.
pub trait RoundSource {
    /// Next candidate, or `None` at end of session.
    fn next_round(&mut self) -> Result<Option<RoundCandidate>>;
}

impl<S: RoundSource + ?Sized> RoundSource for &mut S {
    fn next_round(&mut self) -> Result<Option<RoundCandidate>> {
        (**self).next_round()
    }
}

impl<S: RoundSource + ?Sized> RoundSource for Box<S> {
    fn next_round(&mut self) -> Result<Option<RoundCandidate>> {
        (**self).next_round()
    }
}

/// Adapts any iterator of candidates, e.g. a recorded session.
#[derive(Debug, Clone)]
pub struct IterRoundSource<I> {
    inner: I,
}

impl<I> IterRoundSource<I>
where
    I: Iterator<Item = RoundCandidate>,
{
    pub fn new(rounds: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            inner: rounds.into_iter(),
        }
    }
}

impl<I> RoundSource for IterRoundSource<I>
where
    I: Iterator<Item = RoundCandidate>,
{
    fn next_round(&mut self) -> Result<Option<RoundCandidate>> {
        Ok(self.inner.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigcal_core::Pt3;

    #[test]
    fn iterator_source_ends_with_none() {
        let rounds = vec![
            RoundCandidate::new().with_point("a", Pt3::new(1.0, 0.0, 0.0)),
            RoundCandidate::new().with_point("a", Pt3::new(2.0, 0.0, 0.0)),
        ];
        let mut source = IterRoundSource::new(rounds);
        let by_ref: &mut dyn RoundSource = &mut source;
        assert!(by_ref.next_round().unwrap().is_some());
        assert!(by_ref.next_round().unwrap().is_some());
        assert!(by_ref.next_round().unwrap().is_none());
    }
}
