//! Commit-or-rollback execution of an operation.

use std::fmt::Display;

/// A resource that can group changes into a transaction.
pub trait Transactional {
    /// Failure reported by the resource itself.
    type Error: Display;

    /// Starts a transaction. Resources that begin implicitly keep the default.
    fn begin(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Makes the changes since `begin` durable.
    fn commit(&mut self) -> Result<(), Self::Error>;

    /// Discards the changes since `begin`.
    fn rollback(&mut self) -> Result<(), Self::Error>;
}

/// Where a unit of work is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Begun, neither committed nor rolled back.
    Active,
    /// Committed. Terminal.
    Committed,
    /// Rolled back. Terminal.
    RolledBack,
}

/// One transaction on a borrowed resource.
///
/// Dropping a unit of work that is still active rolls it back.
pub struct UnitOfWork<'a, C>
where
    C: Transactional,
{
    resource: &'a mut C,
    state: TransactionState,
}

impl<'a, C> UnitOfWork<'a, C>
where
    C: Transactional,
{
    /// Begins a transaction on `resource`.
    pub fn begin(resource: &'a mut C) -> Result<Self, C::Error> {
        resource.begin()?;

        Ok(Self {
            resource,
            state: TransactionState::Active,
        })
    }

    /// Current state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// The resource the work is done on.
    pub fn resource(&mut self) -> &mut C {
        self.resource
    }

    /// Commits. The state only moves to `Committed` if the resource accepted it.
    pub fn commit(&mut self) -> Result<(), C::Error> {
        debug_assert_eq!(self.state, TransactionState::Active);

        self.resource.commit()?;
        self.state = TransactionState::Committed;

        Ok(())
    }

    /// Rolls back. The unit of work counts as rolled back even if the resource complained.
    pub fn rollback(&mut self) -> Result<(), C::Error> {
        debug_assert_eq!(self.state, TransactionState::Active);

        self.state = TransactionState::RolledBack;
        self.resource.rollback()
    }
}

impl<C> Drop for UnitOfWork<'_, C>
where
    C: Transactional,
{
    fn drop(&mut self) {
        if self.state != TransactionState::Active {
            return;
        }

        if let Err(e) = self.rollback() {
            log::error!("Failed to roll back abandoned transaction: {e}");
        }
    }
}

/// Runs `op` in a transaction on `resource`.
///
/// On success the transaction is committed and the result returned. If `op` fails the
/// transaction is rolled back and `op`'s error is returned. A failing rollback is logged
/// and does not replace that error.
pub fn run_in_transaction<C, T, E, F>(resource: &mut C, op: F) -> Result<T, E>
where
    C: Transactional,
    E: From<C::Error> + Display,
    F: FnOnce(&mut C) -> Result<T, E>,
{
    let mut work = UnitOfWork::begin(resource)?;

    match op(work.resource()) {
        Ok(value) => {
            work.commit()?;
            log::debug!("Transaction committed");

            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = work.rollback() {
                log::error!("Rollback after '{error}' failed: {rollback_error}");
            } else {
                log::debug!("Transaction rolled back due to error: {error}");
            }

            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, thiserror::Error)]
    enum Error {
        #[error("no such user: {0}")]
        NoSuchUser(u32),
        #[error("resource failure: {0}")]
        Resource(&'static str),
    }

    /// Records what happened to it, with a pending value committed into `value`.
    #[derive(Default)]
    struct Recorder {
        value: u32,
        pending: Option<u32>,
        state: Option<TransactionState>,
        fail_commit: bool,
    }

    impl Transactional for Recorder {
        type Error = &'static str;

        fn begin(&mut self) -> Result<(), Self::Error> {
            self.pending = Some(self.value);
            self.state = Some(TransactionState::Active);
            Ok(())
        }

        fn commit(&mut self) -> Result<(), Self::Error> {
            if self.fail_commit {
                return Err("disk full");
            }

            self.value = self.pending.take().unwrap_or(self.value);
            self.state = Some(TransactionState::Committed);
            Ok(())
        }

        fn rollback(&mut self) -> Result<(), Self::Error> {
            self.pending = None;
            self.state = Some(TransactionState::RolledBack);
            Ok(())
        }
    }

    impl From<&'static str> for Error {
        fn from(message: &'static str) -> Self {
            Error::Resource(message)
        }
    }

    #[test]
    fn success_commits() {
        let mut recorder = Recorder::default();

        let result: Result<u32, Error> = run_in_transaction(&mut recorder, |r| {
            r.pending = Some(10);
            Ok(10)
        });

        assert_eq!(result, Ok(10));
        assert_eq!(recorder.state, Some(TransactionState::Committed));
        assert_eq!(recorder.value, 10);
    }

    #[test]
    fn failure_rolls_back_and_surfaces_original_error() {
        let mut recorder = Recorder::default();

        let result: Result<(), Error> = run_in_transaction(&mut recorder, |r| {
            r.pending = Some(99);
            Err(Error::NoSuchUser(7))
        });

        assert_eq!(result, Err(Error::NoSuchUser(7)));
        assert_eq!(recorder.state, Some(TransactionState::RolledBack));
        assert_eq!(recorder.value, 0);
    }

    #[test]
    fn commit_failure_is_reported() {
        let mut recorder = Recorder {
            fail_commit: true,
            ..Default::default()
        };

        let result: Result<(), Error> = run_in_transaction(&mut recorder, |_| Ok(()));

        assert_eq!(result, Err(Error::Resource("disk full")));
        // The guard rolled back what the resource refused to commit.
        assert_eq!(recorder.state, Some(TransactionState::RolledBack));
    }

    #[test]
    fn dropped_unit_of_work_rolls_back() {
        let mut recorder = Recorder::default();

        {
            let work = UnitOfWork::begin(&mut recorder).unwrap();
            assert_eq!(work.state(), TransactionState::Active);
        }

        assert_eq!(recorder.state, Some(TransactionState::RolledBack));
    }

    #[test]
    fn explicit_states() {
        let mut recorder = Recorder::default();
        let mut work = UnitOfWork::begin(&mut recorder).unwrap();

        work.commit().unwrap();
        assert_eq!(work.state(), TransactionState::Committed);
    }
}
