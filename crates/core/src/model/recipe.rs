use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One build step in a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    /// Push a single recipe file onto the compiler's input stack.
    PushInput { file: String },
    /// Push every recipe file.
    PushInputs,
    /// Compile the input stack to an object file.
    CompileObj { out: String },
    /// Compile and link the input stack to an executable.
    CompileExe { out: String },
}

/// Architecture-specific, ordered build instructions for a subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Directory holding the recipe's files.
    pub dir: PathBuf,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl Recipe {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), files: Vec::new(), instructions: Vec::new() }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.files.push(file.into());
        self
    }

    pub fn with_instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }
}
