pub const CRAB: &str = r"
    _~^~^~_        DDNS Crab
\) /  o o  \ (/    name -> address, kept current
  '_   -   _'
  / '-----' \
";
