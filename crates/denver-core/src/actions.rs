use anyhow::Result;

pub type Action = Box<dyn Fn() -> Result<()> + Send + Sync>;

/// Ordered hooks. The first failure stops the chain and is returned as-is;
/// hooks that already ran are not undone.
#[derive(Default)]
pub struct ActionChain {
    actions: Vec<Action>,
}

impl ActionChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn run(&self) -> Result<()> {
        for action in &self.actions {
            action()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ActionChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionChain")
            .field("len", &self.actions.len())
            .finish()
    }
}
