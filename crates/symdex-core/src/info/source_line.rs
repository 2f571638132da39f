//! Address to source line resolution.

use super::SymbolInfo;
use crate::config::{truncate_to, MAX_STRING_SIZE};
use crate::types::{Address, SourceLine};

impl SymbolInfo
{
    /// Source file and line of `address`.
    ///
    /// `None` if no module owns the address, the module has no symbol source,
    /// or the source has no line entry for the exact module-relative offset.
    /// The file path is bounded by [`MAX_STRING_SIZE`]; longer paths are cut.
    pub fn find_source_line(&self, address: Address) -> Option<SourceLine>
    {
        self.registry
            .with_module(address, |module| {
                let source = module.symbols.source()?;
                let offset = address.offset_from(module.base)?;
                let info = source.find_source_line_info(offset)?;
                Some(SourceLine {
                    file: truncate_to(&info.source_file, MAX_STRING_SIZE),
                    line: info.line_number,
                    displacement: 0,
                })
            })
            .flatten()
    }
}
