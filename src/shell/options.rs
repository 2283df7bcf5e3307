//! Shell options: the `set` family and the glob/match option set
//! managed by `shopt`.

/// Options toggled with `set -x` / `set -o name`.
#[derive(Debug, Clone, Default)]
pub struct ShellOptions {
    /// set -e: exit on the first failing simple command outside a
    /// conditional context.
    pub errexit: bool,
    /// set -o pipefail: a pipeline fails with its rightmost non-zero
    /// status.
    pub pipefail: bool,
    /// set -u: referencing an unset variable is a fatal expansion
    /// error.
    pub nounset: bool,
    /// set -x: print each simple command after expansion, prefixed
    /// with the expansion of PS4.
    pub xtrace: bool,
    /// set -v: echo input lines as read.
    pub verbose: bool,
    /// set -f: disable pathname expansion.
    pub noglob: bool,
    /// set -C: `>` refuses to overwrite existing files.
    pub noclobber: bool,
    /// set -a: every assignment exports.
    pub allexport: bool,
    /// set -n: parse but do not execute.
    pub noexec: bool,
    /// set -m: job control (on by default in interactive shells).
    pub monitor: bool,
}

impl ShellOptions {
    pub fn by_name(&mut self, name: &str) -> Option<&mut bool> {
        match name {
            "errexit" => Some(&mut self.errexit),
            "pipefail" => Some(&mut self.pipefail),
            "nounset" => Some(&mut self.nounset),
            "xtrace" => Some(&mut self.xtrace),
            "verbose" => Some(&mut self.verbose),
            "noglob" => Some(&mut self.noglob),
            "noclobber" => Some(&mut self.noclobber),
            "allexport" => Some(&mut self.allexport),
            "noexec" => Some(&mut self.noexec),
            "monitor" => Some(&mut self.monitor),
            _ => None,
        }
    }

    pub fn get_by_name(&self, name: &str) -> Option<bool> {
        match name {
            "errexit" => Some(self.errexit),
            "pipefail" => Some(self.pipefail),
            "nounset" => Some(self.nounset),
            "xtrace" => Some(self.xtrace),
            "verbose" => Some(self.verbose),
            "noglob" => Some(self.noglob),
            "noclobber" => Some(self.noclobber),
            "allexport" => Some(self.allexport),
            "noexec" => Some(self.noexec),
            "monitor" => Some(self.monitor),
            _ => None,
        }
    }

    pub fn by_flag(&mut self, flag: char) -> Option<&mut bool> {
        match flag {
            'e' => Some(&mut self.errexit),
            'u' => Some(&mut self.nounset),
            'x' => Some(&mut self.xtrace),
            'v' => Some(&mut self.verbose),
            'f' => Some(&mut self.noglob),
            'C' => Some(&mut self.noclobber),
            'a' => Some(&mut self.allexport),
            'n' => Some(&mut self.noexec),
            'm' => Some(&mut self.monitor),
            _ => None,
        }
    }

    pub const NAMES: &'static [&'static str] = &[
        "allexport",
        "errexit",
        "monitor",
        "noclobber",
        "noexec",
        "noglob",
        "nounset",
        "pipefail",
        "verbose",
        "xtrace",
    ];

    /// `$-` one-letter flags for the active options.
    pub fn flag_string(&self, interactive: bool) -> String {
        let mut flags = String::new();
        for (on, c) in [
            (self.allexport, 'a'),
            (self.noclobber, 'C'),
            (self.errexit, 'e'),
            (self.noglob, 'f'),
            (interactive, 'i'),
            (self.monitor, 'm'),
            (self.noexec, 'n'),
            (self.nounset, 'u'),
            (self.verbose, 'v'),
            (self.xtrace, 'x'),
        ] {
            if on {
                flags.push(c);
            }
        }
        flags
    }
}

/// Pattern-matching options managed by `shopt`.
#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Globs match dotfiles without an explicit leading dot.
    pub dotglob: bool,
    /// `**` matches zero or more path components.
    pub globstar: bool,
    /// Non-matching patterns expand to nothing instead of themselves.
    pub nullglob: bool,
    /// Non-matching patterns are an error.
    pub failglob: bool,
    /// Case-insensitive pathname expansion.
    pub nocaseglob: bool,
    /// Case-insensitive `[[ == ]]` and `case` matching.
    pub nocasematch: bool,
    /// Alias expansion (always on in interactive shells).
    pub expand_aliases: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            dotglob: false,
            globstar: false,
            nullglob: false,
            failglob: false,
            nocaseglob: false,
            nocasematch: false,
            expand_aliases: true,
        }
    }
}

impl MatchOptions {
    pub fn by_name(&mut self, name: &str) -> Option<&mut bool> {
        match name {
            "dotglob" => Some(&mut self.dotglob),
            "globstar" => Some(&mut self.globstar),
            "nullglob" => Some(&mut self.nullglob),
            "failglob" => Some(&mut self.failglob),
            "nocaseglob" => Some(&mut self.nocaseglob),
            "nocasematch" => Some(&mut self.nocasematch),
            "expand_aliases" => Some(&mut self.expand_aliases),
            _ => None,
        }
    }

    pub const NAMES: &'static [&'static str] = &[
        "dotglob",
        "expand_aliases",
        "failglob",
        "globstar",
        "nocaseglob",
        "nocasematch",
        "nullglob",
    ];
}
