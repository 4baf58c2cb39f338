use anyhow::anyhow;

/// Whether an in-memory stand-in for a driven port should behave as if its backing system
/// could be reached
pub enum StoreAvailability {
    Reachable,
    Unreachable,
}

impl StoreAvailability {
    pub fn ensure_reachable(&self) -> Result<(), anyhow::Error> {
        match self {
            Self::Reachable => Ok(()),
            Self::Unreachable => Err(anyhow!("the backing store is unreachable")),
        }
    }
}

/// Records every call made to one port method and answers each with the same canned result.
///
/// Mock ports hold one of these per method inside a [std::sync::Mutex], since port methods only
/// get `&self`.
///
/// * [Args] is whatever the mock keeps from each call, usually an owned tuple of the arguments
/// * [Ret] is the method's return type
pub struct FakeImplementation<Args, Ret> {
    saved_arguments: Vec<Args>,
    return_value: Option<Ret>,
}

impl<Args, Ret> FakeImplementation<Args, Ret> {
    pub fn new() -> FakeImplementation<Args, Ret> {
        FakeImplementation {
            saved_arguments: Vec::new(),
            return_value: None,
        }
    }

    pub fn save_arguments(&mut self, arguments: Args) {
        self.saved_arguments.push(arguments)
    }

    /// Arguments of every call so far, oldest first
    pub fn calls(&self) -> &[Args] {
        self.saved_arguments.as_slice()
    }

    fn canned(&self) -> &Ret {
        self.return_value
            .as_ref()
            .unwrap_or_else(|| panic!("A mocked port method was called before its result was set"))
    }
}

impl<Args, Success, Fail> FakeImplementation<Args, Result<Success, Fail>>
where
    Success: Clone,
    Fail: Clone,
{
    pub fn set_returned_result(&mut self, return_value: Result<Success, Fail>) {
        self.return_value = Some(return_value);
    }

    pub fn return_value_result(&self) -> Result<Success, Fail> {
        self.canned().clone()
    }
}

/// [anyhow::Error] can't be cloned, so failures are stored as their message and rebuilt on
/// every call
impl<Args, Success> FakeImplementation<Args, anyhow::Result<Success>>
where
    Success: Clone,
{
    pub fn set_returned_anyhow(&mut self, return_value: anyhow::Result<Success>) {
        self.return_value = Some(return_value.map_err(|err| anyhow!("{err:#}")));
    }

    pub fn return_value_anyhow(&self) -> anyhow::Result<Success> {
        match self.canned() {
            Ok(ok_result) => Ok(ok_result.clone()),
            Err(err) => Err(anyhow!("{err:#}")),
        }
    }
}
