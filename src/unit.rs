use crate::report::BodyBuilder;
use crate::xml;

pub const SIMPLE_UNIT_DEPENDENCY: &str = "inca.SimpleUnitReporter";

/// Body of a pass/fail unit probe: `<unitTest><ID>name</ID></unitTest>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitTest {
    pub name: String,
}

impl UnitTest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn to_xml(&self) -> String {
        xml::element("unitTest", [xml::leaf("ID", &self.name)])
    }
}

impl BodyBuilder for UnitTest {
    fn build_body(&self) -> Option<String> {
        Some(self.to_xml())
    }
}
