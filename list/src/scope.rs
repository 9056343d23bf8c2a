use crate::controller::ListController;
use std::ops::Deref;

/// Scoped acquisition of a controller: dropping the scope tears the
/// controller down on every exit path.
///
/// ```ignore
/// let scope = ListScope::new(controller);
/// scope.start().await;
/// // ... render ...
/// drop(scope); // cancels the in-flight request and releases listeners
/// ```
pub struct ListScope {
    controller: ListController,
}

impl ListScope {
    pub fn new(controller: ListController) -> Self {
        Self { controller }
    }
}

impl Deref for ListScope {
    type Target = ListController;

    fn deref(&self) -> &Self::Target {
        &self.controller
    }
}

impl Drop for ListScope {
    fn drop(&mut self) {
        self.controller.teardown();
    }
}
