pub(super) const ROOT_LONG_ABOUT: &str = "\
Track checksums of a directory tree over time and detect drift

smart-checksum computes a checksum for every file below TARGET and keeps them in a
JSON database inside TARGET. Later runs verify files against those baselines and
append the outcome of every check to the file's history, so you can tell when a
file changed and when it was last known to be good.

MODES:

  (default) calculate
    Computes baseline checksums for files that do not have one yet for the
    selected algorithm. Existing baselines are kept unless --force is given.

  --check
    Verifies files that already have a baseline. A file whose last successful
    check is younger than --max_age is skipped. Every check appends an OK or a
    WRONG entry to the file's history. Files without a baseline are ignored.

  --lastok
    For every file that ever failed verification, shows the last time it was
    seen OK. Can be combined with --check, in which case it runs afterwards.

  --gen_plain_checksum_file
    Writes a plain checksum file (the format understood by md5sum -c and
    sha256sum -c) with paths relative to TARGET. No other mode runs.

DATABASE:

  The database is written atomically with sorted keys, so it is safe to keep
  under version control and to diff between runs. With --save_often it is
  written after every computed checksum, which keeps completed work across a
  crash at the cost of extra I/O. An interrupt (Ctrl-C) finishes the current
  file and saves the database; a second interrupt exits immediately.

SETTINGS FILE:

  --config FILE reads defaults from a TOML file. Command line flags override it.

    checksum = \"sha256\"
    db = \"checksums.json\"
    max_age = \"2w\"
    save_often = true
    digest_backend = \"system\"

    [tools]
    md5 = \"/usr/bin/md5sum\"
    sha256 = \"/usr/bin/sha256sum\"
";

pub(super) const AFTER_HELP: &str = "\
EXAMPLES:

  # Record baselines for everything in /data
  $ smart-checksum /data

  # Verify files not checked during the last two weeks
  $ smart-checksum /data --check --max_age 2w

  # Find out when corrupted files were last good
  $ smart-checksum /data --lastok
";
